// ==========================================
// 航次排产系统 - 操作日志数据仓储
// ==========================================
// 表: schedule_action_log
// 红线: 所有计划生命周期写入必须记录
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
