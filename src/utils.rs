/// `info!` that highlights the message when colorful display is requested.
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)+) => {
        if $colorful {
            log::info!("\x1b[1;96m{}\x1b[0m", format!($($arg)+));
        } else {
            log::info!($($arg)+);
        }
    };
}

/// a macro to declare simple Vec<String>
#[macro_export]
macro_rules! string_vec {
    ($($x:expr),*) => {
        vec![$($x.into()),*]
    };
}

/// Compact count label: 1.2M, 350K, 48.
pub fn edge_number(x: f64) -> String {
    if x >= 1e6 {
        format!("{:.1}M", x * 1e-6)
    } else if x >= 1e4 {
        format!("{:.0}K", x * 1e-3)
    } else {
        format!("{:.0}", x)
    }
}

/// Cuts `s` to at most `max` characters, marking the cut with "...".
pub fn truncate(s: String, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s
    }
}
