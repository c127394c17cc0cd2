//! Barrier Surface - Typed Entry Points
//!
//! Instrumented code calls one entry point per (type, access kind). The
//! names follow the transactional memory ABI: a type suffix
//!
//! | suffix | type                    |
//! |--------|-------------------------|
//! | `u1`   | `u8`                    |
//! | `u2`   | `u16`                   |
//! | `u4`   | `u32`                   |
//! | `u8`   | `u64`                   |
//! | `f`    | `f32`                   |
//! | `d`    | `f64`                   |
//! | `e`    | `LongDouble`            |
//! | `m64`  | `V64`                   |
//! | `m128` | `V128`                  |
//! | `m256` | `V256`                  |
//! | `cf`   | `Complex<f32>`          |
//! | `cd`   | `Complex<f64>`          |
//! | `ce`   | `Complex<LongDouble>`   |
//!
//! and an ordering hint (`read_after_write_u4`, `write_after_read_d`, ...).
//! The hints let a compiler say what it knows about earlier accesses to the
//! same location; every hint resolves to the generic
//! [`Barrier::read`]/[`Barrier::write`].
//!
//! Bulk copies, moves and fills live in [`bulk`].

pub mod bulk;

pub use bulk::Transfer;

use crate::barrier::{Barrier, Prefilter, RawPolicy, ReadOnlyPolicy, WriteSink};
use crate::engine::TxEngine;
use crate::error::Result;
use crate::types::{Complex, LongDouble, V128, V256, V64};

macro_rules! barriers {
    ($(
        $(#[$attr:meta])*
        $ty:ty => {
            read: $read:ident,
            read_after_read: $rar:ident,
            read_after_write: $raw:ident,
            read_for_write: $rfw:ident,
            write: $write:ident,
            write_after_read: $war:ident,
            write_after_write: $waw:ident,
            log: $log:ident $(,)?
        }
    )*) => {
        impl<F: Prefilter, R, O, S> Barrier<F, R, O, S> {
            $(
                $(#[$attr])*
                #[inline]
                pub unsafe fn $read<E>(&self, tx: &mut E, addr: *const $ty) -> Result<$ty>
                where
                    E: TxEngine + ?Sized,
                    R: RawPolicy<E>,
                    O: ReadOnlyPolicy<E>,
                {
                    self.read(tx, addr)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $rar<E>(&self, tx: &mut E, addr: *const $ty) -> Result<$ty>
                where
                    E: TxEngine + ?Sized,
                    R: RawPolicy<E>,
                    O: ReadOnlyPolicy<E>,
                {
                    self.read(tx, addr)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $raw<E>(&self, tx: &mut E, addr: *const $ty) -> Result<$ty>
                where
                    E: TxEngine + ?Sized,
                    R: RawPolicy<E>,
                    O: ReadOnlyPolicy<E>,
                {
                    self.read(tx, addr)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $rfw<E>(&self, tx: &mut E, addr: *const $ty) -> Result<$ty>
                where
                    E: TxEngine + ?Sized,
                    R: RawPolicy<E>,
                    O: ReadOnlyPolicy<E>,
                {
                    self.read(tx, addr)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $write<E>(&self, tx: &mut E, addr: *mut $ty, value: $ty) -> Result<()>
                where
                    E: TxEngine + ?Sized,
                    S: WriteSink<E>,
                {
                    self.write(tx, addr, value)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $war<E>(&self, tx: &mut E, addr: *mut $ty, value: $ty) -> Result<()>
                where
                    E: TxEngine + ?Sized,
                    S: WriteSink<E>,
                {
                    self.write(tx, addr, value)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $waw<E>(&self, tx: &mut E, addr: *mut $ty, value: $ty) -> Result<()>
                where
                    E: TxEngine + ?Sized,
                    S: WriteSink<E>,
                {
                    self.write(tx, addr, value)
                }

                $(#[$attr])*
                #[inline]
                pub unsafe fn $log<E>(&self, tx: &mut E, addr: *const $ty) -> Result<()>
                where
                    E: TxEngine + ?Sized,
                {
                    self.log(tx, addr)
                }
            )*
        }
    };
}

barriers! {
    u8 => {
        read: read_u1,
        read_after_read: read_after_read_u1,
        read_after_write: read_after_write_u1,
        read_for_write: read_for_write_u1,
        write: write_u1,
        write_after_read: write_after_read_u1,
        write_after_write: write_after_write_u1,
        log: log_u1,
    }
    u16 => {
        read: read_u2,
        read_after_read: read_after_read_u2,
        read_after_write: read_after_write_u2,
        read_for_write: read_for_write_u2,
        write: write_u2,
        write_after_read: write_after_read_u2,
        write_after_write: write_after_write_u2,
        log: log_u2,
    }
    u32 => {
        read: read_u4,
        read_after_read: read_after_read_u4,
        read_after_write: read_after_write_u4,
        read_for_write: read_for_write_u4,
        write: write_u4,
        write_after_read: write_after_read_u4,
        write_after_write: write_after_write_u4,
        log: log_u4,
    }
    u64 => {
        read: read_u8,
        read_after_read: read_after_read_u8,
        read_after_write: read_after_write_u8,
        read_for_write: read_for_write_u8,
        write: write_u8,
        write_after_read: write_after_read_u8,
        write_after_write: write_after_write_u8,
        log: log_u8,
    }
    f32 => {
        read: read_f,
        read_after_read: read_after_read_f,
        read_after_write: read_after_write_f,
        read_for_write: read_for_write_f,
        write: write_f,
        write_after_read: write_after_read_f,
        write_after_write: write_after_write_f,
        log: log_f,
    }
    f64 => {
        read: read_d,
        read_after_read: read_after_read_d,
        read_after_write: read_after_write_d,
        read_for_write: read_for_write_d,
        write: write_d,
        write_after_read: write_after_read_d,
        write_after_write: write_after_write_d,
        log: log_d,
    }
    LongDouble => {
        read: read_e,
        read_after_read: read_after_read_e,
        read_after_write: read_after_write_e,
        read_for_write: read_for_write_e,
        write: write_e,
        write_after_read: write_after_read_e,
        write_after_write: write_after_write_e,
        log: log_e,
    }
    V64 => {
        read: read_m64,
        read_after_read: read_after_read_m64,
        read_after_write: read_after_write_m64,
        read_for_write: read_for_write_m64,
        write: write_m64,
        write_after_read: write_after_read_m64,
        write_after_write: write_after_write_m64,
        log: log_m64,
    }
    V128 => {
        read: read_m128,
        read_after_read: read_after_read_m128,
        read_after_write: read_after_write_m128,
        read_for_write: read_for_write_m128,
        write: write_m128,
        write_after_read: write_after_read_m128,
        write_after_write: write_after_write_m128,
        log: log_m128,
    }
    V256 => {
        read: read_m256,
        read_after_read: read_after_read_m256,
        read_after_write: read_after_write_m256,
        read_for_write: read_for_write_m256,
        write: write_m256,
        write_after_read: write_after_read_m256,
        write_after_write: write_after_write_m256,
        log: log_m256,
    }
    Complex<f32> => {
        read: read_cf,
        read_after_read: read_after_read_cf,
        read_after_write: read_after_write_cf,
        read_for_write: read_for_write_cf,
        write: write_cf,
        write_after_read: write_after_read_cf,
        write_after_write: write_after_write_cf,
        log: log_cf,
    }
    Complex<f64> => {
        read: read_cd,
        read_after_read: read_after_read_cd,
        read_after_write: read_after_write_cd,
        read_for_write: read_for_write_cd,
        write: write_cd,
        write_after_read: write_after_read_cd,
        write_after_write: write_after_write_cd,
        log: log_cd,
    }
    Complex<LongDouble> => {
        read: read_ce,
        read_after_read: read_after_read_ce,
        read_after_write: read_after_write_ce,
        read_for_write: read_for_write_ce,
        write: write_ce,
        write_after_read: write_after_read_ce,
        write_after_write: write_after_write_ce,
        log: log_ce,
    }
}
