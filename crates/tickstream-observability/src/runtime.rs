use std::time::Instant;
use sysinfo::System;

/// Snapshot of runtime/system metrics gathered from sysinfo.
#[derive(Debug, Clone)]
pub struct RuntimeMetrics {
    pub uptime_seconds: u64,
    pub uptime_human: String,
    pub memory_mb: Option<u64>,
    pub cpu_usage_percent: Option<f32>,
    pub system_total_memory_mb: u64,
    pub system_used_memory_mb: u64,
    pub pid: Option<u32>,
}

impl RuntimeMetrics {
    /// Render a concise log line for the console.
    pub fn to_log_string(&self) -> String {
        format!(
            "uptime={} mem={}MB cpu={} pid={} sys_mem={}MB/{}MB",
            self.uptime_human,
            self.memory_mb.unwrap_or(0),
            self.cpu_usage_percent
                .map(|v| format!("{:.2}%", v))
                .unwrap_or_else(|| "N/A".to_string()),
            self.pid.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string()),
            self.system_used_memory_mb,
            self.system_total_memory_mb,
        )
    }
}

/// Collect runtime metrics using the server start time for uptime.
pub fn collect_runtime_metrics(start_time: Instant) -> RuntimeMetrics {
    let uptime_seconds = start_time.elapsed().as_secs();
    let days = uptime_seconds / 86_400;
    let hours = (uptime_seconds % 86_400) / 3_600;
    let minutes = (uptime_seconds % 3_600) / 60;
    let uptime_human = if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    };

    let mut sys = System::new_all();
    sys.refresh_all();

    let mut memory_mb = None;
    let mut cpu_usage_percent = None;
    let mut pid_num = None;

    if let Ok(pid) = sysinfo::get_current_pid() {
        if let Some(proc) = sys.process(pid) {
            pid_num = Some(proc.pid().as_u32());
            memory_mb = Some(proc.memory() / 1024 / 1024);
            cpu_usage_percent = Some(proc.cpu_usage());
        }
    }

    RuntimeMetrics {
        uptime_seconds,
        uptime_human,
        memory_mb,
        cpu_usage_percent,
        system_total_memory_mb: sys.total_memory() / 1024 / 1024,
        system_used_memory_mb: sys.used_memory() / 1024 / 1024,
        pid: pid_num,
    }
}
