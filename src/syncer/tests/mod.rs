//! Lifecycle, proxy fallback and batch tests over the scripted transport.

mod proxy;
