#[macro_export]
macro_rules! unwrap_or_return {
    ($e:expr, $r:expr) => {
        match $e {
            Some(e) => e,
            None => return $r,
        }
    };
    ($e:expr) => {
        $crate::unwrap_or_return!($e, None)
    };
}

#[macro_export]
macro_rules! unwrap_or {
    ($e:expr, $f:expr) => {
        match $e {
            Some(e) => e,
            None => $f,
        }
    };
}
