//! 常用测试辅助函数

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use bizops_domain::FixedClock;

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test timestamp")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn fixed_clock(year: i32, month: u32, day: u32) -> FixedClock {
    FixedClock(utc(year, month, day, 9))
}

pub fn money(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid test amount")
}
