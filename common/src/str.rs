use arrayvec::Array;
use arrayvec::ArrayString;

/// Copies as much of `s` into an `ArrayString` as fits without splitting a
/// UTF-8 code point.
pub fn truncated_arraystring<A: Array<Item = u8> + Copy>(mut s: &str) -> ArrayString<A> {
    let mut result = ArrayString::new();
    if s.len() > result.capacity() {
        let end = (0..result.capacity() + 1)
            .rev()
            .find(|&n| s.is_char_boundary(n))
            .unwrap_or(0);
        s = &s[..end];
    }
    result.push_str(s);
    result
}

#[cfg(test)]
mod test {
    use super::truncated_arraystring;
    use quickcheck::quickcheck;

    #[test]
    fn multibyte_boundary() {
        assert_eq!(&*truncated_arraystring::<[u8; 4]>("abcdef"), "abcd");
        assert_eq!(&*truncated_arraystring::<[u8; 4]>("aä€"), "aä");
        assert_eq!(&*truncated_arraystring::<[u8; 2]>("€"), "");
    }

    quickcheck! {
        fn prefix4(v: String) -> bool {
            let t = truncated_arraystring::<[u8; 4]>(&v);
            v.starts_with(&*t) && t.len() <= 4 && (v.len() <= 4 || t.len() + 3 >= 4)
        }
        fn prefix11(v: String) -> bool {
            let t = truncated_arraystring::<[u8; 11]>(&v);
            v.starts_with(&*t) && (v.len() <= 11) == (t.len() == v.len())
        }
        fn prefix31(v: String) -> bool {
            let t = truncated_arraystring::<[u8; 31]>(&v);
            v.starts_with(&*t) && t.len() <= 31
        }
    }
}
