use std::{
    collections::HashSet,
    future::Future,
    pin::pin,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::channel,
        Arc, Mutex,
    },
    task::{Context, Poll, Wake, Waker},
    thread::{self, Thread},
    time::{Duration, Instant},
};

use tcp_pool_net::{PoolError, WorkError, WorkerPool};

#[test]
fn should_execute_every_item_exactly_once() {
    for worker_count in [1, 2, 4, 8] {
        let item_count = 64;
        let counters: Arc<Vec<AtomicUsize>> =
            Arc::new((0..item_count).map(|_| AtomicUsize::new(0)).collect());

        let pool = WorkerPool::new(worker_count).unwrap();
        for index in 0..item_count {
            let counters = counters.clone();
            pool.submit(move || counters[index].fetch_add(1, Ordering::SeqCst))
                .unwrap();
        }
        drop(pool);

        for (index, counter) in counters.iter().enumerate() {
            assert_eq!(
                1,
                counter.load(Ordering::SeqCst),
                "item {index} with {worker_count} workers"
            );
        }
    }
}

#[test]
fn should_return_all_results_regardless_of_interleaving() {
    let pool = WorkerPool::new(2).unwrap();
    let started = Instant::now();

    let handles: Vec<_> = (0..5u32)
        .map(|id| {
            pool.submit(move || {
                thread::sleep(Duration::from_millis(50));
                id * 10
            })
            .unwrap()
        })
        .collect();

    let results: HashSet<u32> = handles
        .into_iter()
        .map(|handle| handle.wait().unwrap())
        .collect();

    assert_eq!(HashSet::from([0, 10, 20, 30, 40]), results);

    // Two workers need at least three rounds of 50ms for five items
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[test]
fn should_drain_queue_in_submission_order_before_drop_returns() {
    let pool = WorkerPool::new(1).unwrap();
    let completed = Arc::new(Mutex::new(Vec::new()));

    for index in 0..10 {
        let completed = completed.clone();
        pool.submit(move || {
            thread::sleep(Duration::from_millis(2));
            completed.lock().unwrap().push(index);
        })
        .unwrap();
    }
    drop(pool);

    assert_eq!((0..10).collect::<Vec<_>>(), *completed.lock().unwrap());
}

#[test]
fn should_reject_work_after_shutdown() {
    let pool = WorkerPool::new(2).unwrap();
    pool.shutdown();

    let executed = Arc::new(AtomicBool::new(false));
    let flag = executed.clone();
    let result = pool.submit(move || flag.store(true, Ordering::SeqCst));

    assert_eq!(Some(PoolError::Closed), result.err());
    thread::sleep(Duration::from_millis(20));
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn should_reject_work_while_shutdown_is_draining() {
    let pool = Arc::new(WorkerPool::new(1).unwrap());
    let (release_sender, release_receiver) = channel::<()>();
    let (started_sender, started_receiver) = channel::<()>();

    let blocker = pool
        .submit(move || {
            started_sender.send(()).unwrap();
            release_receiver.recv().unwrap();
            "drained"
        })
        .unwrap();
    started_receiver.recv().unwrap();

    let stopping_pool = pool.clone();
    let stopper = thread::spawn(move || stopping_pool.shutdown());

    while !pool.is_shut_down() {
        thread::sleep(Duration::from_millis(1));
    }

    let executed = Arc::new(AtomicBool::new(false));
    let flag = executed.clone();
    assert_eq!(
        Some(PoolError::Closed),
        pool.submit(move || flag.store(true, Ordering::SeqCst)).err()
    );

    release_sender.send(()).unwrap();
    stopper.join().unwrap();

    assert_eq!(Ok("drained"), blocker.wait());
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn should_block_every_shutdown_caller_until_work_is_done() {
    let pool = Arc::new(WorkerPool::new(1).unwrap());
    let (started_sender, started_receiver) = channel::<()>();
    let done = Arc::new(AtomicBool::new(false));

    let worker_done = done.clone();
    pool.submit(move || {
        started_sender.send(()).unwrap();
        thread::sleep(Duration::from_millis(300));
        worker_done.store(true, Ordering::SeqCst);
    })
    .unwrap();
    started_receiver.recv().unwrap();

    let stopping_pool = pool.clone();
    let first = thread::spawn(move || stopping_pool.shutdown());
    while !pool.is_shut_down() {
        thread::sleep(Duration::from_millis(1));
    }

    pool.shutdown();
    assert!(done.load(Ordering::SeqCst));

    first.join().unwrap();
}

#[test]
fn should_keep_worker_alive_after_panicking_work() {
    let pool = WorkerPool::named("survivor", 1).unwrap();

    let failed = pool.submit(|| -> u32 { panic!("work failed") }).unwrap();
    assert_eq!(
        Err(WorkError::Panicked {
            msg: String::from("work failed")
        }),
        failed.wait()
    );

    let next = pool
        .submit(|| thread::current().name().map(String::from))
        .unwrap();
    assert_eq!(Ok(Some(String::from("survivor-0"))), next.wait());
}

#[test]
fn should_resolve_handle_as_future() {
    let pool = WorkerPool::new(1).unwrap();
    let handle = pool
        .submit(|| {
            thread::sleep(Duration::from_millis(20));
            "async result"
        })
        .unwrap();

    assert_eq!(Ok("async result"), block_on(handle));
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut context = Context::from_waker(&waker);
    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}
