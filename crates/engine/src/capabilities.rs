//! Capability declarations for the virtual output device
//!
//! Every `(event type, event code)` a macro can emit must be declared before
//! the virtual device is created, or the kernel will silently drop the
//! event. Builders grow the set while the macro is compiled; it is frozen
//! once the macro starts running.

use keyloom_codes::{REL_HWHEEL, REL_WHEEL, REL_X, REL_Y, EV_REL};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    codes: BTreeMap<u16, BTreeSet<u16>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: u16, code: u16) {
        self.codes.entry(kind).or_default().insert(code);
    }

    /// Declare everything the display server needs to recognize the device
    /// as a pointer. Required whenever any `EV_REL` event is emitted,
    /// whichever axis it uses.
    pub fn add_pointer_footprint(&mut self) {
        for code in [REL_X, REL_Y, REL_WHEEL, REL_HWHEEL] {
            self.add(EV_REL, code);
        }
    }

    pub fn merge(&mut self, other: &Capabilities) {
        for (kind, codes) in &other.codes {
            self.codes.entry(*kind).or_default().extend(codes);
        }
    }

    pub fn contains(&self, kind: u16, code: u16) -> bool {
        self.codes
            .get(&kind)
            .is_some_and(|codes| codes.contains(&code))
    }

    /// Codes declared for one event type, if any.
    pub fn codes_for(&self, kind: u16) -> Option<&BTreeSet<u16>> {
        self.codes.get(&kind)
    }

    /// Iterate declared `(type, codes)` buckets in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &BTreeSet<u16>)> {
        self.codes.iter().map(|(kind, codes)| (*kind, codes))
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
