//! Context values that expandos read from.
//!
//! [`GlobalContext`] holds what every logger of a registry shares, a
//! [`MacroContext`] is the read-only view handed to the encoder for one call.

use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use minstant::{Anchor, Instant};

/// Source of wall-clock time for `#wall_time`.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Samples the TSC through [`minstant`] and converts to Unix time with an
/// [`Anchor`] taken at construction.
pub struct SystemClock {
    anchor: Anchor,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            anchor: Anchor::new(),
        }
    }

    fn compute_unix_nanos(&self, now: Instant) -> u64 {
        now.as_unix_nanos(&self.anchor)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let nanos = self.compute_unix_nanos(Instant::now());
        Utc.timestamp_nanos(nanos as i64)
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Context shared by every logger of a registry.
#[derive(Clone, Debug)]
pub struct GlobalContext {
    pub(crate) ip_addr: Rc<str>,
    pub(crate) app_name: Rc<str>,
    pub(crate) logical_time: u64,
    pub(crate) callback_id: i64,
    pub(crate) request_id: i64,
}

impl GlobalContext {
    pub fn new(app_name: &str, ip_addr: &str) -> GlobalContext {
        GlobalContext {
            ip_addr: Rc::from(ip_addr),
            app_name: Rc::from(app_name),
            logical_time: 0,
            callback_id: -1,
            request_id: -1,
        }
    }

    pub fn ip_addr(&self) -> &str {
        &self.ip_addr
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn logical_time(&self) -> u64 {
        self.logical_time
    }

    pub fn callback_id(&self) -> i64 {
        self.callback_id
    }

    pub fn request_id(&self) -> i64 {
        self.request_id
    }
}

/// Everything an expando can resolve to while encoding one message.
pub struct MacroContext<'a> {
    globals: &'a GlobalContext,
    module_name: &'a Rc<str>,
    clock: &'a dyn Clock,
}

impl<'a> MacroContext<'a> {
    pub fn new(
        globals: &'a GlobalContext,
        module_name: &'a Rc<str>,
        clock: &'a dyn Clock,
    ) -> MacroContext<'a> {
        MacroContext {
            globals,
            module_name,
            clock,
        }
    }

    pub fn ip_addr(&self) -> &Rc<str> {
        &self.globals.ip_addr
    }

    pub fn app_name(&self) -> &Rc<str> {
        &self.globals.app_name
    }

    pub fn module_name(&self) -> &Rc<str> {
        self.module_name
    }

    pub fn logical_time(&self) -> u64 {
        self.globals.logical_time
    }

    pub fn callback_id(&self) -> i64 {
        self.globals.callback_id
    }

    pub fn request_id(&self) -> i64 {
        self.globals.request_id
    }

    /// Samples the wall clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_utc() {
        let clock = SystemClock::new();
        let sampled = clock.now();
        let reference = Utc::now();
        let drift = (reference - sampled).num_milliseconds().abs();
        assert!(drift < 1000, "drift of {}ms", drift);
    }

    #[test]
    fn defaults_of_shared_context() {
        let globals = GlobalContext::new("billing", "10.0.0.7");
        let module: Rc<str> = Rc::from("ledger");
        let clock = FixedClock(Utc.timestamp_nanos(0));
        let ctx = MacroContext::new(&globals, &module, &clock);

        assert_eq!(&**ctx.app_name(), "billing");
        assert_eq!(&**ctx.ip_addr(), "10.0.0.7");
        assert_eq!(&**ctx.module_name(), "ledger");
        assert_eq!(ctx.logical_time(), 0);
        assert_eq!(ctx.callback_id(), -1);
        assert_eq!(ctx.request_id(), -1);
        assert_eq!(ctx.now(), Utc.timestamp_nanos(0));
    }
}
