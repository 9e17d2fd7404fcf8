use std::convert::TryInto;
use std::fmt;
use zerocopy::AsBytes;
use zerocopy::FromBytes;
use zerocopy::FromZeroes;
use zerocopy::Unaligned;

/// Checked integer conversions.
///
/// Values read from files are untrusted, so every narrowing or sign-changing
/// conversion goes through one of these instead of `as`.
pub trait Cast: Sized {
    fn try_u8(self) -> Option<u8>;
    fn try_u16(self) -> Option<u16>;
    fn try_i32(self) -> Option<i32>;
    fn try_u32(self) -> Option<u32>;
    fn try_u64(self) -> Option<u64>;
    fn try_usize(self) -> Option<usize>;
}

/// Conversions that can't lose information on the supported platforms
/// (`usize` at least 32 bits, at most 64 bits).
pub trait Widen: Sized {
    fn usize(self) -> usize;
    fn u64(self) -> u64;
}

const _: () = assert!(std::mem::size_of::<usize>() >= 4);
const _: () = assert!(std::mem::size_of::<usize>() <= 8);

macro_rules! impl_cast {
    ($($t:ty),*) => {
        $(
            impl Cast for $t {
                #[inline] fn try_u8(self) -> Option<u8> { self.try_into().ok() }
                #[inline] fn try_u16(self) -> Option<u16> { self.try_into().ok() }
                #[inline] fn try_i32(self) -> Option<i32> { self.try_into().ok() }
                #[inline] fn try_u32(self) -> Option<u32> { self.try_into().ok() }
                #[inline] fn try_u64(self) -> Option<u64> { self.try_into().ok() }
                #[inline] fn try_usize(self) -> Option<usize> { self.try_into().ok() }
            }
        )*
    };
}

macro_rules! impl_widen {
    ($($t:ty),*) => {
        $(
            impl Widen for $t {
                #[inline] fn usize(self) -> usize { self as usize }
                #[inline] fn u64(self) -> u64 { self as u64 }
            }
        )*
    };
}

impl_cast!(i16, u16, i32, u32, i64, u64, usize);
impl_widen!(u8, u16, u32);

impl Widen for usize {
    #[inline] fn usize(self) -> usize { self }
    #[inline] fn u64(self) -> u64 { self as u64 }
}

/// Little-endian signed 16-bit integer
///
/// Is internally represented as `[u8; 2]`, so it can be embedded in unaligned
/// on-disk records.
#[repr(transparent)]
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[derive(AsBytes, FromBytes, FromZeroes, Unaligned)]
pub struct LeI16([u8; 2]);

impl LeI16 {
    pub fn from_i16(value: i16) -> LeI16 {
        LeI16(value.to_le_bytes())
    }
    pub fn to_i16(self) -> i16 {
        i16::from_le_bytes(self.0)
    }
}

impl fmt::Debug for LeI16 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.to_i16().fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::Cast;
    use super::LeI16;
    use super::Widen;
    use std::mem;
    use zerocopy::AsBytes;

    #[test]
    fn le_i16_layout() {
        assert_eq!(mem::size_of::<LeI16>(), 2);
        assert_eq!(mem::align_of::<LeI16>(), 1);
        assert_eq!(LeI16::from_i16(-2).as_bytes(), &[0xfe, 0xff]);
        assert_eq!(LeI16::from_i16(0x1234).to_i16(), 0x1234);
    }

    #[test]
    fn checked() {
        assert_eq!((-1i32).try_usize(), None);
        assert_eq!(0x1_0000i32.try_u16(), None);
        assert_eq!(0xffffi32.try_u16(), Some(0xffff));
        assert_eq!(usize::MAX.try_i32(), None);
        assert_eq!(7u16.usize(), 7);
        assert_eq!(u32::MAX.u64(), 0xffff_ffff);
    }
}
