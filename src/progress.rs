
//! Report progress of long running transcode passes and allow cancelling them.

use crate::error::{Error, UnitResult};


/// Tag reported while packing rows into bytes.
pub const EXPORT_TAG: &str = "Export/Image";

/// Tag reported while unpacking bytes into rows.
pub const IMPORT_TAG: &str = "Import/Image";

/// Tag reported while decoding a stream into an image.
pub const LOAD_TAG: &str = "Load/Image";

/// Tag reported while encoding an image into a stream.
pub const SAVE_TAG: &str = "Save/Image";


/// Consulted after each row or unit of work.
/// Return `Err(Error::Aborted)` to stop after the current row.
pub trait OnProgress {

    /// `current` units of `total` units are done.
    fn on_progressed(&mut self, tag: &'static str, current: usize, total: usize) -> UnitResult;
}

/// Ignore progress and never stop.
impl OnProgress for () {
    #[inline]
    fn on_progressed(&mut self, _: &'static str, _: usize, _: usize) -> UnitResult { Ok(()) }
}

/// Call a closure with the fraction done, between `0.0` and `1.0`.
/// The closure returns whether to continue.
impl<F> OnProgress for F where F: FnMut(f64) -> bool {
    #[inline]
    fn on_progressed(&mut self, _: &'static str, current: usize, total: usize) -> UnitResult {
        let progress = if total == 0 { 1.0 } else { current as f64 / total as f64 };
        if self(progress) { Ok(()) } else { Err(Error::Aborted) }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn closure_can_abort(){
        let mut seen = Vec::new();
        let mut callback = |progress: f64| { seen.push(progress); progress < 0.5 };

        assert!(callback.on_progressed(SAVE_TAG, 1, 4).is_ok());
        assert!(matches!(callback.on_progressed(SAVE_TAG, 2, 4), Err(Error::Aborted)));
        assert_eq!(seen, vec![ 0.25, 0.5 ]);

        assert!(().on_progressed(LOAD_TAG, 0, 0).is_ok());
    }
}
