
//! Per-worker scratch buffers that packed rows are staged in.

use log::debug;
use crate::error::{Error, Result};
use crate::resource::ResourceLimits;


/// Written after the last usable byte of every buffer,
/// and checked when the buffers are released.
pub const GUARD_SIGNATURE: u8 = 0xab;


/// One zeroed byte buffer per worker, each with room for one packed row.
/// The buffers are released when the pool is dropped.
#[derive(Debug)]
pub struct ScratchPool {
    buffers: Vec<Vec<u8>>,
    extent: usize,
}

impl ScratchPool {

    /// Allocate as many buffers as the limits allow workers,
    /// each holding `extent` bytes followed by the guard byte.
    pub fn acquire(extent: usize, limits: &ResourceLimits, filename: &str) -> Result<Self> {
        let buffer_count = limits.thread_limit();
        let buffer_size = extent.checked_add(1)
            .ok_or_else(|| Error::resource_limit("scratch buffer extent overflows"))?;

        let total = buffer_size.checked_mul(buffer_count)
            .ok_or_else(|| Error::resource_limit("scratch buffer extent overflows"))?;

        limits.check_memory(total, filename)?;
        debug!("allocating {} scratch buffers of {} bytes for `{}`", buffer_count, extent, filename);

        let mut buffers = Vec::with_capacity(buffer_count);
        for _ in 0 .. buffer_count {
            let mut buffer = Vec::new();
            buffer.try_reserve_exact(buffer_size).map_err(|_| Error::resource_limit(format!(
                "memory allocation failed `{}`: scratch buffer of {} bytes", filename, buffer_size
            )))?;

            buffer.resize(extent, 0);
            buffer.push(GUARD_SIGNATURE);
            buffers.push(buffer);
        }

        Ok(ScratchPool { buffers, extent })
    }

    /// The number of usable bytes in each buffer.
    #[inline]
    pub fn extent(&self) -> usize { self.extent }

    /// The number of workers that can use a buffer at the same time.
    #[inline]
    pub fn buffer_count(&self) -> usize { self.buffers.len() }

    /// The private buffer of a worker, without the guard byte.
    pub fn buffer_mut(&mut self, worker: usize) -> &mut [u8] {
        let extent = self.extent;
        &mut self.buffers[worker][.. extent]
    }

    /// All buffers, without their guard bytes.
    pub fn buffers_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        let extent = self.extent;
        self.buffers.iter_mut().map(move |buffer| &mut buffer[.. extent])
    }

    /// Whether every guard byte still holds the signature.
    pub fn is_intact(&self) -> bool {
        self.buffers.iter().all(|buffer| buffer.get(self.extent) == Some(&GUARD_SIGNATURE))
    }
}

impl Drop for ScratchPool {
    fn drop(&mut self) {
        debug_assert!(self.is_intact(), "scratch buffer overrun detected");
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buffers_per_worker(){
        let limits = ResourceLimits { threads: Some(3), .. Default::default() };
        let mut pool = ScratchPool::acquire(10, &limits, "scratch").unwrap();
        assert_eq!(pool.buffer_count(), 3);
        assert_eq!(pool.extent(), 10);

        for buffer in pool.buffers_mut() {
            assert_eq!(buffer, &[ 0_u8; 10 ]);
            buffer.iter_mut().for_each(|byte| *byte = 7);
        }

        assert_eq!(pool.buffer_mut(2)[9], 7);
        assert!(pool.is_intact());
    }

    #[test]
    fn memory_limit(){
        let limits = ResourceLimits { threads: Some(4), max_memory_bytes: Some(40) };
        assert!(matches!(ScratchPool::acquire(10, &limits, "scratch"), Err(Error::ResourceLimit(_))));
        assert!(ScratchPool::acquire(9, &limits, "scratch").is_ok());
        assert!(matches!(ScratchPool::acquire(usize::MAX, &limits, "scratch"), Err(Error::ResourceLimit(_))));
    }
}
