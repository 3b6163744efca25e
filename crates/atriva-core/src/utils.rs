//! 通用工具函数

/// 稳定场景标识
pub const SCENARIO_STABLE: &str = "stable";
/// 危重场景标识
pub const SCENARIO_CRITICAL: &str = "critical";
/// 危重患者档案键
pub const CRITICAL_PATIENT_KEY: &str = "231";
/// 默认（稳定）患者档案键
pub const DEFAULT_PATIENT_KEY: &str = "100";

/// 由场景标识解析患者档案键
///
/// 全映射：数字标识直接使用；"critical"映射到固定危重档案键；
/// 其余一律映射到默认档案键。
pub fn resolve_patient_key(scenario: &str) -> String {
    if is_numeric_id(scenario) {
        scenario.to_string()
    } else if scenario == SCENARIO_CRITICAL {
        CRITICAL_PATIENT_KEY.to_string()
    } else {
        DEFAULT_PATIENT_KEY.to_string()
    }
}

/// 判断是否为纯数字患者标识
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// 提取上传文件名词干
///
/// 小写化并去掉 .dat/.csv/.txt 扩展名。
pub fn filename_stem(filename: &str) -> String {
    let lowered = filename.to_lowercase();
    for ext in [".dat", ".csv", ".txt"] {
        if let Some(stem) = lowered.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    lowered
}

/// 格式化运行时长为 HH:MM:SS
pub fn format_uptime(total_secs: u64) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
