//! Windows desktop backend
//!
//! Injects input with `SendInput` and listens for the global Ctrl+Alt+Q
//! hotkey with `RegisterHotKey` on a dedicated message-loop thread.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use windows::Win32::Foundation::{LPARAM, POINT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, SendInput, UnregisterHotKey, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE,
    KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOUSEEVENTF_MOVE, MOUSEINPUT, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetMessageW, GetSystemMetrics, PostThreadMessageW, SetProcessDPIAware, MSG,
    SM_CXSCREEN, SM_CYSCREEN, WM_HOTKEY, WM_QUIT,
};

use super::{DisplayReader, EnvironmentError, InjectionError, InputInjector, Key};
use crate::motion::{DisplayArea, Point};

const HOTKEY_ID: i32 = 1;
const VK_Q: u32 = 0x51;

/// Real desktop driven through `SendInput`
pub struct WindowsDesktop;

impl WindowsDesktop {
    /// Create the backend; coordinates are reported in physical pixels
    pub fn new() -> Self {
        // Without DPI awareness the metrics are scaled and the clamp is off
        unsafe {
            let _ = SetProcessDPIAware();
        }
        Self
    }

    fn send(&self, input: INPUT, action: &'static str) -> Result<(), InjectionError> {
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 1 {
            Ok(())
        } else {
            Err(InjectionError::Os {
                action,
                message: windows::core::Error::from_thread().to_string(),
            })
        }
    }

    fn key_input(key: Key, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(key.virtual_code()),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }
}

impl Default for WindowsDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for WindowsDesktop {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: MOUSEEVENTF_MOVE,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        self.send(input, "pointer move")
    }

    fn key_down(&mut self, key: Key) -> Result<(), InjectionError> {
        self.send(Self::key_input(key, KEYBD_EVENT_FLAGS(0)), "key down")
    }

    fn key_up(&mut self, key: Key) -> Result<(), InjectionError> {
        self.send(Self::key_input(key, KEYEVENTF_KEYUP), "key up")
    }
}

impl DisplayReader for WindowsDesktop {
    fn cursor_position(&self) -> Result<Point, EnvironmentError> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| EnvironmentError::CursorUnavailable(e.to_string()))?;
        Ok(Point::new(point.x as f64, point.y as f64))
    }

    fn display_area(&self) -> Result<DisplayArea, EnvironmentError> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(EnvironmentError::DisplayUnavailable(format!(
                "GetSystemMetrics reported {}x{}",
                width, height
            )));
        }
        Ok(DisplayArea::sized(width as f64, height as f64))
    }
}

/// Global Ctrl+Alt+Q listener
///
/// The callback runs on the listener thread every time the hotkey is
/// pressed. Dropping the listener unregisters the hotkey.
pub struct HotkeyListener {
    thread_id: u32,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyListener {
    /// Register the hotkey and start listening
    pub fn spawn(on_trigger: impl Fn() + Send + 'static) -> Result<Self, EnvironmentError> {
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("orbit-hotkey".to_string())
            .spawn(move || {
                let thread_id = unsafe { GetCurrentThreadId() };
                let registered = unsafe {
                    RegisterHotKey(None, HOTKEY_ID, MOD_CONTROL | MOD_ALT | MOD_NOREPEAT, VK_Q)
                };
                if let Err(e) = registered {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(thread_id));

                let mut msg = MSG::default();
                loop {
                    let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    // 0 is WM_QUIT, -1 is an error
                    if result.0 == 0 || result.0 == -1 {
                        break;
                    }
                    if msg.message == WM_HOTKEY && msg.wParam.0 == HOTKEY_ID as usize {
                        log::info!("Hotkey Ctrl+Alt+Q pressed");
                        on_trigger();
                    }
                }

                unsafe {
                    let _ = UnregisterHotKey(None, HOTKEY_ID);
                }
            })
            .map_err(|e| EnvironmentError::Hotkey(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => Ok(Self {
                thread_id,
                handle: Some(handle),
            }),
            Ok(Err(message)) => {
                let _ = handle.join();
                Err(EnvironmentError::Hotkey(message))
            }
            Err(_) => Err(EnvironmentError::Hotkey(
                "listener thread exited early".to_string(),
            )),
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
