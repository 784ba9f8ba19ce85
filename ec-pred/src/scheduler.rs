use config::{METHOD_LEVEL_THREADS, MIN_THREADS};
use log::info;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Granularity a unit of work is submitted at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Protein,
    Method,
    Class,
}

struct Pools {
    protein: ThreadPool,
    method: ThreadPool,
    class: ThreadPool,
}

impl Pools {
    fn get(&self, tier: Tier) -> &ThreadPool {
        match tier {
            Tier::Protein => &self.protein,
            Tier::Method => &self.method,
            Tier::Class => &self.class,
        }
    }
}

/// Three bounded worker pools owned by one run. An inline scheduler runs
/// every unit on the calling thread.
pub struct Scheduler {
    pools: Option<Pools>,
}

impl Scheduler {
    pub fn new(budget: usize) -> Result<Self, ThreadPoolBuildError> {
        let budget = budget.max(MIN_THREADS);
        let class_threads = (budget / 2).max(MIN_THREADS);

        let pools = Pools {
            protein: pool("protein", budget)?,
            method: pool("method", METHOD_LEVEL_THREADS)?,
            class: pool("class", class_threads)?,
        };

        info!(
            "Worker pools: {} protein, {} method, {} class threads",
            budget, METHOD_LEVEL_THREADS, class_threads
        );

        Ok(Self { pools: Some(pools) })
    }

    pub fn inline() -> Self {
        Self { pools: None }
    }

    pub fn threads(&self, tier: Tier) -> usize {
        self.pools
            .as_ref()
            .map_or(1, |pools| pools.get(tier).current_num_threads())
    }

    /// Run `f` over `items` on the tier's pool and wait for all of them.
    /// Results keep the input order.
    pub fn map<T, R, F>(&self, tier: Tier, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        match &self.pools {
            Some(pools) => pools
                .get(tier)
                .install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(&f).collect(),
        }
    }

    /// As `map`, with each unit's panic caught and returned as its message
    pub fn map_isolated<T, R, F>(&self, tier: Tier, items: &[T], f: F) -> Vec<Result<R, String>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        self.map(tier, items, |item| {
            catch_unwind(AssertUnwindSafe(|| f(item))).map_err(panic_message)
        })
    }
}

fn pool(name: &'static str, threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |idx| format!("{}-worker-{}", name, idx))
        .build()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
