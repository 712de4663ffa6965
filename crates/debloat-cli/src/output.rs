/// Write to stdout, swallowing broken-pipe errors so piping into tools
/// like `head` exits cleanly instead of panicking.
#[macro_export]
macro_rules! println_or_exit {
    () => {{
        let _ = writeln!(std::io::stdout());
    }};
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stdout(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! print_or_exit {
    ($($arg:tt)*) => {{
        let _ = write!(std::io::stdout(), $($arg)*);
    }};
}
