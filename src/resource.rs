
//! Advise how many scratch buffers may be kept and how much memory they may use.

use crate::error::{Error, UnitResult};


/// Resource limits consulted when allocating scratch buffers and codec tables.
///
/// All fields default to `None`, which means no explicit limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceLimits {

    /// Maximum number of parallel workers.
    /// Defaults to the size of the global thread pool.
    pub threads: Option<usize>,

    /// Maximum number of bytes a single allocation may occupy.
    pub max_memory_bytes: Option<u64>,
}

impl ResourceLimits {

    /// Run everything on one thread.
    pub fn single_threaded() -> Self {
        ResourceLimits { threads: Some(1), .. Self::default() }
    }

    /// The number of workers that may transcode rows concurrently, at least one.
    pub fn thread_limit(&self) -> usize {
        self.threads.unwrap_or_else(default_thread_count).max(1)
    }

    /// Check that an allocation size is within memory limits.
    pub fn check_memory(&self, bytes: usize, filename: &str) -> UnitResult {
        if let Some(max_memory) = self.max_memory_bytes {
            if bytes as u64 > max_memory {
                return Err(Error::resource_limit(format!(
                    "memory allocation failed `{}`: {} bytes exceed the limit of {} bytes",
                    filename, bytes, max_memory
                )));
            }
        }

        Ok(())
    }
}

#[cfg(feature = "rayon")]
fn default_thread_count() -> usize {
    rayon_core::current_num_threads()
}

#[cfg(not(feature = "rayon"))]
fn default_thread_count() -> usize { 1 }


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn limits(){
        assert_eq!(ResourceLimits::single_threaded().thread_limit(), 1);
        assert_eq!(ResourceLimits { threads: Some(0), .. Default::default() }.thread_limit(), 1);
        assert!(ResourceLimits::default().thread_limit() >= 1);

        let limits = ResourceLimits { max_memory_bytes: Some(16), .. Default::default() };
        assert!(limits.check_memory(16, "a").is_ok());
        assert!(matches!(limits.check_memory(17, "a"), Err(Error::ResourceLimit(_))));
    }
}
