//! Type-safe SDK handle wrappers.
//!
//! The vendor SDK hands out opaque handles for every hardware object
//! it manages (boards, spans, trunks, phones, HDLC framers, media
//! streams, event queues). A raw handle is just an integer, so this
//! module wraps it with a phantom kind parameter: passing a trunk
//! handle where a span handle is expected fails at compile time.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw SDK handle type (matches the C typedef).
pub type RawHandle = u64;

/// Marker trait for SDK handle kinds.
pub trait HandleKind: Send + Sync + 'static {
    /// Returns the handle kind name for debugging.
    fn kind_name() -> &'static str;
}

/// A type-safe SDK handle.
#[derive(Clone, Copy)]
pub struct Handle<K: HandleKind> {
    raw: RawHandle,
    _marker: PhantomData<K>,
}

impl<K: HandleKind> Handle<K> {
    /// The null handle.
    pub const NULL: Self = Self {
        raw: 0,
        _marker: PhantomData,
    };

    /// Creates a handle from a raw value. Returns `None` for 0.
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    /// Creates a handle from a raw value, including null.
    pub const fn from_raw_unchecked(raw: RawHandle) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the raw handle value.
    pub const fn as_raw(&self) -> RawHandle {
        self.raw
    }

    /// Returns true if this is the null handle.
    pub const fn is_null(&self) -> bool {
        self.raw == 0
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:012x})", K::kind_name(), self.raw)
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:012x}", self.raw)
    }
}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: HandleKind> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

macro_rules! handle_kind {
    ($kind:ident, $alias:ident, $name:literal) => {
        /// Handle kind marker.
        #[derive(Debug, Clone, Copy)]
        pub struct $kind;

        impl HandleKind for $kind {
            fn kind_name() -> &'static str {
                $name
            }
        }

        /// Typed handle alias.
        pub type $alias = Handle<$kind>;
    };
}

handle_kind!(SystemKind, SystemHandle, "System");
handle_kind!(BoardKind, BoardHandle, "Board");
handle_kind!(SpanKind, SpanHandle, "Span");
handle_kind!(TrunkKind, TrunkHandle, "Trunk");
handle_kind!(PhoneKind, PhoneHandle, "Phone");
handle_kind!(HdlcKind, HdlcHandle, "Hdlc");
handle_kind!(StreamKind, StreamHandle, "Stream");
handle_kind!(QueueKind, QueueHandle, "Queue");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        let h = BoardHandle::NULL;
        assert!(h.is_null());
        assert_eq!(h.as_raw(), 0);
        assert!(BoardHandle::from_raw(0).is_none());
    }

    #[test]
    fn test_from_raw() {
        let h = SpanHandle::from_raw(42).unwrap();
        assert!(!h.is_null());
        assert_eq!(h.as_raw(), 42);
    }

    #[test]
    fn test_debug_carries_kind() {
        let h = TrunkHandle::from_raw(7).unwrap();
        assert!(format!("{:?}", h).starts_with("Trunk("));
    }
}
