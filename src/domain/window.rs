// ==========================================
// 航次排产系统 - 时间窗口
// ==========================================
// 半开区间 [start, end)，首尾相接不算重叠
// ==========================================

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// 构造时间窗口 (start > end 时自动交换)
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// 由起点与小时数构造
    pub fn from_hours(start: NaiveDateTime, hours: f64) -> Self {
        Self::new(start, start + hours_to_duration(hours))
    }

    pub fn duration_hours(&self) -> f64 {
        duration_to_hours(self.end - self.start)
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 重叠小时数 (不重叠返回 0)
    pub fn overlap_hours(&self, other: &TimeWindow) -> f64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            duration_to_hours(end - start)
        } else {
            0.0
        }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// 半开区间 [start, end) 判定
    pub fn contains_half_open(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }

    pub fn shifted(&self, delta: Duration) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

/// 小时数 → chrono::Duration (按秒取整，保证同输入同输出)
pub fn hours_to_duration(hours: f64) -> Duration {
    if !hours.is_finite() || hours <= 0.0 {
        return Duration::zero();
    }
    Duration::seconds((hours * 3600.0).round() as i64)
}

pub fn duration_to_hours(d: Duration) -> f64 {
    d.num_seconds() as f64 / 3600.0
}
