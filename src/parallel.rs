//! Parallel processing configuration and management
//!
//! Parallel frame generation runs on a dedicated Rayon thread pool built from a
//! [`ParallelConfig`]; scheduling is left entirely to Rayon.

use crate::errors::{MovieError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads; `None` lets Rayon decide
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Build a thread pool with this configuration
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("frame-worker-{i}"));
        if let Some(num_threads) = self.num_threads {
            if num_threads == 0 {
                return Err(MovieError::InvalidConfig(
                    "number of threads must be positive".to_string(),
                ));
            }
            builder = builder.num_threads(num_threads);
        }

        let pool = builder.build().map_err(|e| {
            MovieError::ThreadPoolError(format!(
                "Failed to initialize thread pool with {:?} threads: {}",
                self.num_threads, e
            ))
        })?;
        log::debug!(
            "configured parallel frame generation with {} threads",
            pool.current_num_threads()
        );
        Ok(pool)
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

impl ParallelInfo {
    /// Print parallel processing information
    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
        println!("   Available parallelism: {}", self.available_parallelism);
    }
}
