use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Local;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::models::{
    DeviceClass, DeviceInfo, MemorySnapshot, NavigationTiming, PaintTiming, ResourceEntry,
};

/// Everything the pipeline reads from the environment it runs in: timing
/// entries, device facts and the current page.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Resolves once the host has painted the frame that triggered sampling.
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }

    fn navigation_timing(&self) -> Option<NavigationTiming>;

    fn paint_timing(&self) -> PaintTiming;

    /// `None` when the host has no memory introspection.
    fn memory(&self) -> Option<MemorySnapshot>;

    fn resource_entries(&self) -> Vec<ResourceEntry>;

    fn device(&self) -> DeviceInfo;

    fn user_agent(&self) -> String;

    fn page_url(&self) -> String;
}

const DEFAULT_SCREEN: (u32, u32) = (1920, 1080);

/// Host backed by the current OS process. It has no navigation or paint
/// timing of its own; memory comes from the process table.
pub struct ProcessHost {
    page_url: String,
    screen: (u32, u32),
    system: Mutex<System>,
    pid: Pid,
}

impl ProcessHost {
    pub fn new(page_url: impl Into<String>) -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        system.refresh_memory();

        Self {
            page_url: page_url.into(),
            screen: DEFAULT_SCREEN,
            system: Mutex::new(system),
            pid,
        }
    }

    /// Viewport reported in [`DeviceInfo`]; the device class follows the width.
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = (width, height);
        self
    }
}

#[async_trait]
impl HostEnvironment for ProcessHost {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }

    fn paint_timing(&self) -> PaintTiming {
        PaintTiming::default()
    }

    fn memory(&self) -> Option<MemorySnapshot> {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]));
        system.refresh_memory();

        let total_bytes = system.total_memory();
        system.process(self.pid).map(|process| MemorySnapshot {
            used_bytes: process.memory(),
            total_bytes,
            limit_bytes: total_bytes,
        })
    }

    fn resource_entries(&self) -> Vec<ResourceEntry> {
        Vec::new()
    }

    fn device(&self) -> DeviceInfo {
        let language = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(|tag| tag.replace('_', "-")))
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| "en-US".to_string());

        let (screen_width, screen_height) = self.screen;
        DeviceInfo {
            screen_width,
            screen_height,
            device_class: DeviceClass::from_screen_width(screen_width),
            connection_type: "unknown".into(),
            language,
            timezone: Local::now().format("%:z").to_string(),
        }
    }

    fn user_agent(&self) -> String {
        format!(
            "storefront-telemetry/{} ({})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        )
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_host_reports_own_memory() {
        let host = ProcessHost::new("/");
        let memory = host.memory().expect("current process is always listed");
        assert!(memory.used_bytes > 0);
        assert!(memory.total_bytes >= memory.used_bytes);
    }

    #[test]
    fn process_host_is_a_desktop_without_timing() {
        let host = ProcessHost::new("https://shop.example/");
        assert!(host.navigation_timing().is_none());
        assert_eq!(host.device().device_class, DeviceClass::Desktop);
        assert_eq!(host.page_url(), "https://shop.example/");
        assert!(host.user_agent().starts_with("storefront-telemetry/"));
    }

    #[test]
    fn device_class_follows_configured_screen() {
        let phone = ProcessHost::new("/").with_screen(390, 844).device();
        assert_eq!(phone.device_class, DeviceClass::Mobile);
        assert_eq!((phone.screen_width, phone.screen_height), (390, 844));

        let tablet = ProcessHost::new("/").with_screen(800, 1280).device();
        assert_eq!(tablet.device_class, DeviceClass::Tablet);
    }
}
