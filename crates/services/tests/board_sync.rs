//! Integration tests for move fanout across server instances.
//!
//! Each "instance" is a BoardConnections + dispatcher pair; sharing one bus
//! and one database between two of them is exactly a two-node cluster with a
//! perfect network.

use std::sync::Arc;
use std::time::Duration;

use db::models::{
    board::{Board, CreateBoard},
    column::{Column, CreateColumn},
    task::{CreateTask, Task},
};
use db::test_utils::setup_test_pool;
use services::services::{
    board_connections::BoardConnections,
    cluster_bus::{ClusterBus, LoopbackBus},
    sync::{BoardSync, MoveError, MoveTaskRequest},
};
use sqlx::SqlitePool;
use tokio::time::timeout;
use uuid::Uuid;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_TIMEOUT: Duration = Duration::from_millis(200);

struct Instance {
    connections: BoardConnections,
    sync: BoardSync,
    _dispatcher: tokio::task::JoinHandle<()>,
}

impl Instance {
    fn start(pool: SqlitePool, bus: Arc<dyn ClusterBus>) -> Self {
        let connections = BoardConnections::new();
        let sync = BoardSync::new(pool, bus);
        let dispatcher = sync.spawn_dispatcher(connections.clone());
        Self {
            connections,
            sync,
            _dispatcher: dispatcher,
        }
    }
}

async fn seed(pool: &SqlitePool) -> (Uuid, Uuid, Uuid, Task) {
    let board = Board::create(pool, &CreateBoard { title: "B1".into() })
        .await
        .unwrap();
    let col_a = Column::create(
        pool,
        &CreateColumn {
            board_id: board.id,
            title: "A".into(),
            position: 0,
        },
    )
    .await
    .unwrap();
    let col_b = Column::create(
        pool,
        &CreateColumn {
            board_id: board.id,
            title: "B".into(),
            position: 1,
        },
    )
    .await
    .unwrap();
    let task = Task::create(
        pool,
        &CreateTask {
            column_id: col_a.id,
            title: "t1".into(),
            description: None,
            position: 0,
        },
    )
    .await
    .unwrap();
    (board.id, col_a.id, col_b.id, task)
}

#[tokio::test]
async fn move_on_one_instance_reaches_viewers_on_the_other_but_not_the_initiator() {
    let (pool, _dir) = setup_test_pool().await;
    let (board_id, _, col_b, task) = seed(&pool).await;

    let bus: Arc<dyn ClusterBus> = Arc::new(LoopbackBus::new());
    let instance1 = Instance::start(pool.clone(), bus.clone());
    let instance2 = Instance::start(pool.clone(), bus.clone());

    // X views on instance 1, Y on instance 2, Z also on instance 1.
    let x = Uuid::new_v4();
    let y = Uuid::new_v4();
    let z = Uuid::new_v4();
    let mut x_rx = instance1.connections.register(x).await;
    let mut y_rx = instance2.connections.register(y).await;
    let mut z_rx = instance1.connections.register(z).await;
    instance1.connections.join(board_id, x).await;
    instance2.connections.join(board_id, y).await;
    instance1.connections.join(board_id, z).await;

    let moved = instance1
        .sync
        .move_task(
            task.id,
            &MoveTaskRequest {
                column_id: col_b,
                position: 1,
                version: 0,
                connection_id: Some(x),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.version, 1);

    // Y (other instance) and Z (same instance) both receive the update.
    let update = timeout(RECV_TIMEOUT, y_rx.recv()).await.unwrap().unwrap();
    assert_eq!(update.board_id, board_id);
    assert_eq!(update.task.version, 1);
    assert_eq!(update.task.column_id, col_b);

    let update = timeout(RECV_TIMEOUT, z_rx.recv()).await.unwrap().unwrap();
    assert_eq!(update.task.id, task.id);

    // X never sees an echo of its own change.
    assert!(timeout(QUIET_TIMEOUT, x_rx.recv()).await.is_err());
}

#[tokio::test]
async fn simultaneous_moves_from_two_viewers_resolve_to_one_winner() {
    let (pool, _dir) = setup_test_pool().await;
    let (_, _, col_b, task) = seed(&pool).await;
    let col_c = {
        let board = Board::find_all(&pool).await.unwrap().remove(0);
        Column::create(
            &pool,
            &CreateColumn {
                board_id: board.id,
                title: "C".into(),
                position: 2,
            },
        )
        .await
        .unwrap()
    };

    // Lift the task to version 3 first, mirroring a board with history.
    let bus: Arc<dyn ClusterBus> = Arc::new(LoopbackBus::new());
    let sync = BoardSync::new(pool.clone(), bus.clone());
    for expected in 0..3 {
        sync.move_task(
            task.id,
            &MoveTaskRequest {
                column_id: task.column_id,
                position: 0,
                version: expected,
                connection_id: None,
            },
        )
        .await
        .unwrap();
    }

    // X and Y race with the same expected version 3.
    let sync_x = sync.clone();
    let sync_y = sync.clone();
    let (task_x, task_y) = (task.id, task.id);
    let x = tokio::spawn(async move {
        sync_x
            .move_task(
                task_x,
                &MoveTaskRequest {
                    column_id: col_b,
                    position: 1,
                    version: 3,
                    connection_id: None,
                },
            )
            .await
    });
    let y = tokio::spawn(async move {
        sync_y
            .move_task(
                task_y,
                &MoveTaskRequest {
                    column_id: col_c.id,
                    position: 1,
                    version: 3,
                    connection_id: None,
                },
            )
            .await
    });

    let results = [x.await.unwrap(), y.await.unwrap()];
    let wins: Vec<&Task> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0].version, 4);
    assert!(wins[0].column_id == col_b || wins[0].column_id == col_c.id);

    let conflict = results
        .iter()
        .find_map(|r| match r {
            Err(MoveError::Conflict(current)) => Some(current),
            _ => None,
        })
        .expect("the loser must observe a conflict");
    assert_eq!(conflict.version, 4);
    assert_eq!(conflict.column_id, wins[0].column_id);
}

#[tokio::test]
async fn version_increases_by_one_per_accepted_move_under_contention() {
    let (pool, _dir) = setup_test_pool().await;
    let (_, col_a, col_b, task) = seed(&pool).await;

    let sync = BoardSync::new(pool.clone(), Arc::new(LoopbackBus::new()));

    // Drive the task through many rounds of racing movers; after each round
    // the version must have advanced by exactly one.
    for round in 0..5 {
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sync = sync.clone();
            let target = if round % 2 == 0 { col_b } else { col_a };
            let task_id = task.id;
            handles.push(tokio::spawn(async move {
                sync.move_task(
                    task_id,
                    &MoveTaskRequest {
                        column_id: target,
                        position: 0,
                        version: round,
                        connection_id: None,
                    },
                )
                .await
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1, "round {round} must have exactly one winner");

        let current = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(current.version, round + 1);
    }
}

#[tokio::test]
async fn disconnected_viewer_is_skipped_without_error() {
    let (pool, _dir) = setup_test_pool().await;
    let (board_id, _, col_b, task) = seed(&pool).await;

    let bus: Arc<dyn ClusterBus> = Arc::new(LoopbackBus::new());
    let instance1 = Instance::start(pool.clone(), bus.clone());
    let instance2 = Instance::start(pool.clone(), bus.clone());

    let x = Uuid::new_v4();
    let y = Uuid::new_v4();
    let _x_rx = instance1.connections.register(x).await;
    let y_rx = instance2.connections.register(y).await;
    instance1.connections.join(board_id, x).await;
    instance2.connections.join(board_id, y).await;

    // Y disconnects; its membership must vanish from every board.
    instance2.connections.drop_all(y).await;
    instance2.connections.unregister(y).await;
    drop(y_rx);
    assert_eq!(instance2.connections.member_count(board_id).await, 0);

    // A subsequent move succeeds and fans out without a delivery attempt to Y.
    let moved = instance1
        .sync
        .move_task(
            task.id,
            &MoveTaskRequest {
                column_id: col_b,
                position: 0,
                version: 0,
                connection_id: Some(x),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.version, 1);
}
