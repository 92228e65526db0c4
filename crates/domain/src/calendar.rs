//! 日期运算工具
//!
//! 优先级评分与周期账单共用的纯函数。月、季、年按日历规则推进，
//! 月末日期会被截断到目标月份的最后一天（1月31日 + 1个月 = 2月28/29日）。

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::value_objects::Frequency;
use bizops_errors::{BizOpsError, BizOpsResult};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 距截止时间的天数，向上取整
///
/// 已过期返回负数；截止时间在当前时刻之后不足一天返回 1，
/// 在当前时刻之前不足一天返回 0。
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds() as f64;
    // -0.0 转 i64 为 0
    (millis / MILLIS_PER_DAY).ceil() as i64
}

/// 按频率推进一个日历单位
pub fn roll_forward(date: NaiveDate, frequency: Frequency) -> BizOpsResult<NaiveDate> {
    let next = match frequency {
        Frequency::Daily => date.checked_add_days(Days::new(1)),
        Frequency::Weekly => date.checked_add_days(Days::new(7)),
        Frequency::Monthly => date.checked_add_months(Months::new(1)),
        Frequency::Quarterly => date.checked_add_months(Months::new(3)),
        Frequency::Yearly => date.checked_add_months(Months::new(12)),
    };
    next.ok_or_else(|| {
        BizOpsError::validation_error(format!("日期 {date} 按 {frequency} 推进后超出可表示范围"))
    })
}

/// 账期区间 `[start, end)`，start 为给定日期，end 为下一个账期起点
pub fn period_bounds(date: NaiveDate, frequency: Frequency) -> BizOpsResult<(NaiveDate, NaiveDate)> {
    Ok((date, roll_forward(date, frequency)?))
}

/// 给定日期是否已到期（当天或更早）
pub fn is_due_on_or_before(date: NaiveDate, today: NaiveDate) -> bool {
    date <= today
}
