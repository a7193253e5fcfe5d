/// Choose between iter and par_iter
#[cfg(not(feature = "parallel"))]
#[macro_export]
macro_rules! iter {
    ($e:expr) => {
        $e.iter()
    };
}

/// Choose between iter and par_iter
#[cfg(feature = "parallel")]
#[macro_export]
macro_rules! iter {
    ($e:expr) => {
        $e.par_iter()
    };
}

/// Choose between iter_mut and par_iter_mut
#[cfg(not(feature = "parallel"))]
#[macro_export]
macro_rules! iter_mut {
    ($e:expr) => {
        $e.iter_mut()
    };
}

/// Choose between iter_mut and par_iter_mut
#[cfg(feature = "parallel")]
#[macro_export]
macro_rules! iter_mut {
    ($e:expr) => {
        $e.par_iter_mut()
    };
}

/// Choose between into_iter and into_par_iter
#[cfg(not(feature = "parallel"))]
#[macro_export]
macro_rules! into_iter {
    ($e:expr) => {
        $e.into_iter()
    };
}

/// Choose between into_iter and into_par_iter
#[cfg(feature = "parallel")]
#[macro_export]
macro_rules! into_iter {
    ($e:expr) => {
        $e.into_par_iter()
    };
}

/// Choose between chunks and par_chunks
#[cfg(not(feature = "parallel"))]
#[macro_export]
macro_rules! chunks {
    ($e:expr, $n:expr) => {
        $e.chunks($n)
    };
}

/// Choose between chunks and par_chunks
#[cfg(feature = "parallel")]
#[macro_export]
macro_rules! chunks {
    ($e:expr, $n:expr) => {
        $e.par_chunks($n)
    };
}

/// Choose between chunks_mut and par_chunks_mut
#[cfg(not(feature = "parallel"))]
#[macro_export]
macro_rules! chunks_mut {
    ($e:expr, $n:expr) => {
        $e.chunks_mut($n)
    };
}

/// Choose between chunks_mut and par_chunks_mut
#[cfg(feature = "parallel")]
#[macro_export]
macro_rules! chunks_mut {
    ($e:expr, $n:expr) => {
        $e.par_chunks_mut($n)
    };
}

/// Number of workers bulk operations are spread across.
#[cfg(feature = "parallel")]
pub fn num_workers() -> usize {
    rayon::current_num_threads()
}

/// Number of workers bulk operations are spread across.
#[cfg(not(feature = "parallel"))]
pub fn num_workers() -> usize {
    1
}
