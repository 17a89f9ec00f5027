// EveTranslator - platform/window.rs
//
// Client window liveness check used by identity-channel discovery.
//
// A character whose client window is open counts as active even when its
// transcript has been quiet. The client titles its window `EVE - <name>`.
// Only Windows can enumerate those windows; elsewhere the check reports
// nothing open and activity falls back to transcript recency alone.

use crate::util::constants::CLIENT_WINDOW_TITLE_PREFIX;

/// Checks whether a character's game client window is currently open.
pub trait WindowCheck: Send + Sync {
    fn is_client_window_open(&self, character_name: &str) -> bool;
}

/// Exact window title the client uses for `character_name`.
pub fn client_window_title(character_name: &str) -> String {
    format!("{CLIENT_WINDOW_TITLE_PREFIX}{character_name}")
}

/// Check that never finds a window.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWindowCheck;

impl WindowCheck for NoWindowCheck {
    fn is_client_window_open(&self, _character_name: &str) -> bool {
        false
    }
}

/// Check backed by the operating system's window list.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWindowCheck;

impl WindowCheck for SystemWindowCheck {
    fn is_client_window_open(&self, character_name: &str) -> bool {
        if character_name.is_empty() {
            return false;
        }
        let title = client_window_title(character_name);
        let found = imp::window_with_title_exists(&title);
        tracing::trace!(title = %title, found, "Client window check");
        found
    }
}

#[cfg(windows)]
mod imp {
    use windows::core::BOOL;
    use windows::Win32::Foundation::{HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextLengthW, GetWindowTextW,
    };

    struct Search<'a> {
        target: &'a str,
        found: bool,
    }

    unsafe extern "system" fn visit_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
        // SAFETY: `lparam` is the `Search` passed to `EnumWindows` below,
        // which outlives the enumeration.
        let search = unsafe { &mut *(lparam.0 as *mut Search<'_>) };

        let len = unsafe { GetWindowTextLengthW(hwnd) };
        if len <= 0 {
            return BOOL(1);
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
        if copied > 0 && String::from_utf16_lossy(&buf[..copied as usize]) == search.target {
            search.found = true;
            // Returning FALSE stops the enumeration.
            return BOOL(0);
        }
        BOOL(1)
    }

    pub(super) fn window_with_title_exists(title: &str) -> bool {
        let mut search = Search {
            target: title,
            found: false,
        };
        // EnumWindows reports an error when the callback stops it early, so
        // the result says nothing about whether the window was found.
        let result = unsafe {
            EnumWindows(
                Some(visit_window),
                LPARAM(&mut search as *mut Search<'_> as isize),
            )
        };
        if let Err(e) = result {
            if !search.found {
                tracing::debug!(error = %e, "Window enumeration failed");
            }
        }
        search.found
    }
}

#[cfg(not(windows))]
mod imp {
    pub(super) fn window_with_title_exists(_title: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_window_title() {
        assert_eq!(client_window_title("Eric Atlantis"), "EVE - Eric Atlantis");
    }

    #[test]
    fn test_checks_ignore_empty_names() {
        assert!(!SystemWindowCheck.is_client_window_open(""));
        assert!(!NoWindowCheck.is_client_window_open("Anyone"));
    }
}
