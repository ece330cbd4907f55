//! Carrying module state across a reload.
//!
//! The host copies the outgoing module's bytes, and the incoming module resizes
//! them to its own declared layout: missing tail bytes are zeroed and surplus bytes
//! are dropped. Neither case is an error.

use crate::module::SimModule;

/// Owned module state bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateBlob(Vec<u8>);

impl StateBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn zeroed(size: usize) -> Self {
        Self(vec![0; size])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Snapshot the active module's state. The module keeps its own copy, so a failed
/// reload loses nothing.
pub fn extract(module: &dyn SimModule) -> StateBlob {
    StateBlob::new(module.get_state().to_vec())
}

/// Hand a previously extracted blob to a newly activated module.
pub fn inject(module: &mut dyn SimModule, blob: &StateBlob) {
    module.reload_state(blob.as_bytes());
}

/// Resize `incoming` to `declared_size` bytes for the receiving module.
///
/// Bytes `[0, min(len, declared_size))` are kept verbatim, the rest is zero. A zero
/// declared size carries nothing and allocates nothing.
pub fn adopt_state(incoming: &[u8], declared_size: usize) -> Option<StateBlob> {
    if declared_size == 0 {
        return None;
    }
    let mut bytes = vec![0u8; declared_size];
    let kept = incoming.len().min(declared_size);
    bytes[..kept].copy_from_slice(&incoming[..kept]);
    Some(StateBlob(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_size_round_trip_is_identity() {
        let original = [7u8, 1, 255, 0, 42];
        let adopted = adopt_state(&original, original.len()).unwrap();
        assert_eq!(adopted.as_bytes(), &original);
    }

    #[test]
    fn growth_zero_fills_only_the_tail() {
        let adopted = adopt_state(&[1, 2, 3, 4], 8).unwrap();
        assert_eq!(adopted.as_bytes(), &[1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn shrink_truncates() {
        let adopted = adopt_state(&[9, 8, 7, 6, 5], 2).unwrap();
        assert_eq!(adopted.into_bytes(), vec![9, 8]);
    }

    #[test]
    fn empty_input_yields_zeroed_state() {
        assert_eq!(adopt_state(&[], 3), Some(StateBlob::zeroed(3)));
    }

    #[test]
    fn zero_declared_size_carries_nothing() {
        assert_eq!(adopt_state(&[1, 2, 3], 0), None);
    }
}
