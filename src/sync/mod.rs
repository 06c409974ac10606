//! Synchronization Support
//!
//! The switch core has exactly two kinds of lock, both blocking
//! [`lock_api::Mutex`]es over a raw mutex chosen by the host:
//!
//! - the register map lock, one per [`RegisterMap`](crate::RegisterMap),
//!   held for every register access and for whole multi-register
//!   sequences (table queries, flushes)
//! - the L2 lock, one per [`Switch`](crate::Switch), an application-level
//!   lock for read-then-write sequences on the forwarding database
//!
//! The L2 lock is always taken first. Code holding the register map lock
//! never takes the L2 lock. Neither lock is reentrant: calling back into
//! the same map from inside [`RegisterMap::locked`](crate::RegisterMap::locked)
//! deadlocks.
//!
//! Without a host choice both use [`CriticalSectionRawMutex`]. Any
//! [`RawMutex`] fits, e.g. an RTOS mutex or `spin::mutex::SpinMutex<()>`.
//!
//! # Example
//!
//! ```ignore
//! use rtl8365mb::RegisterMap;
//!
//! let map: RegisterMap<_, _, MyRtosRawMutex> = RegisterMap::new(smi, delay);
//! ```

mod primitives;

pub use lock_api::RawMutex;
pub use primitives::CriticalSectionRawMutex;
