use std::sync::Arc;
use std::thread;

use binlog::MysqlKeyProvider;
use common::log::init_test_log;
use pipe::{BinlogSourceBuilder, DestinationBuilder, Pipe, PipeKey, PipeManager, PipeMetrics};

use crate::support::{transaction, wait_until, Change, RecordingPublisher, ServerHandle, SERVER_UUID};

fn pipe(name: &str, handle: &ServerHandle, publisher: Arc<RecordingPublisher>) -> Arc<Pipe> {
    let source = BinlogSourceBuilder::new(name, handle.client())
        .with_server_uuid(SERVER_UUID)
        .build()
        .unwrap();
    let destination = DestinationBuilder::new(name, publisher)
        .with_pool(2, Arc::new(MysqlKeyProvider))
        .build()
        .unwrap();
    Arc::new(Pipe::new(Arc::new(source), Arc::new(destination), Arc::new(PipeMetrics::new(name))))
}

#[test]
fn test_partitions_run_independently() {
    init_test_log();
    let manager = PipeManager::new();

    let users = ServerHandle::new(transaction(100, &[Change::Insert(1, "a")]));
    let users_out = Arc::new(RecordingPublisher::default());
    let orders = ServerHandle::new(transaction(100, &[Change::Insert(2, "b")]));
    let orders_out = Arc::new(RecordingPublisher::default());

    manager.add_pipes("cdc", "0", vec![pipe("users", &users, users_out.clone())]).unwrap();
    manager.add_pipes("cdc", "1", vec![pipe("orders", &orders, orders_out.clone())]).unwrap();
    assert_eq!(manager.keys(), vec![PipeKey::new("cdc", "0"), PipeKey::new("cdc", "1")]);

    assert!(wait_until(|| users_out.len() == 1 && orders_out.len() == 1));

    manager.remove_pipe("cdc", "0").unwrap();
    assert_eq!(manager.pipe_count(), 1);

    // the other partition keeps reading
    orders.append(transaction(200, &[Change::Insert(3, "c")]));
    assert!(wait_until(|| orders_out.len() == 2));
    assert_eq!(orders_out.user_ids(), vec!["2", "3"]);
    users.append(transaction(200, &[Change::Insert(4, "d")]));

    manager.stop_all().unwrap();
    assert!(manager.is_empty());
    assert_eq!(users_out.len(), 1);
}

#[test]
fn test_concurrent_add_and_remove() {
    init_test_log();
    let manager = Arc::new(PipeManager::new());

    let handles = (0..4)
        .map(|partition| {
            let manager = manager.clone();
            thread::spawn(move || {
                for round in 0..5 {
                    let server = ServerHandle::new(transaction(100, &[Change::Insert(round, "x")]));
                    let out = Arc::new(RecordingPublisher::default());
                    let name = format!("p{}-{}", partition, round);

                    let p = pipe(&name, &server, out.clone());
                    manager.add_pipes("cdc", &partition.to_string(), vec![p.clone()]).unwrap();
                    assert!(p.is_started());
                    assert!(wait_until(|| out.len() == 1));

                    manager.remove_pipe("cdc", &partition.to_string()).unwrap();
                    assert!(!p.is_started());
                }
            })
        })
        .collect::<Vec<_>>();

    for h in handles {
        h.join().unwrap();
    }
    assert!(manager.is_empty());
}
