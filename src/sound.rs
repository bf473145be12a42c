//! 倒计时结束提示音

use tracing::{debug, warn};

/// 播放系统“感叹号”提示音
#[cfg(windows)]
pub fn play_notification() {
    use windows_sys::Win32::System::Diagnostics::Debug::MessageBeep;
    use windows_sys::Win32::UI::WindowsAndMessaging::MB_ICONEXCLAMATION;

    let ok = unsafe { MessageBeep(MB_ICONEXCLAMATION) };
    if ok == 0 {
        warn!("MessageBeep failed");
    } else {
        debug!("notification sound played");
    }
}

/// 非 Windows：终端响铃
#[cfg(not(windows))]
pub fn play_notification() {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    match stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
        Ok(()) => debug!("notification bell written"),
        Err(e) => warn!("failed to ring bell: {e}"),
    }
}
