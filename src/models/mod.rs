pub mod booking;
pub mod catalog;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod record;
pub mod schedule;
pub mod staff;
pub mod user;

pub use booking::*;
pub use catalog::*;
pub use enums::*;
pub use filters::*;
pub use patient::*;
pub use record::*;
pub use schedule::*;
pub use staff::*;
pub use user::*;

/// Joins name parts as "last first patronymic", dropping a missing patronymic.
pub fn join_full_name(last_name: &str, first_name: &str, patronymic: Option<&str>) -> String {
    format!("{} {} {}", last_name, first_name, patronymic.unwrap_or(""))
        .trim()
        .to_string()
}

/// Whole years between `birth_date` and `today`, birthday-aware.
pub fn age_on(birth_date: chrono::NaiveDate, today: chrono::NaiveDate) -> i32 {
    use chrono::Datelike;
    let had_birthday = (today.month(), today.day()) >= (birth_date.month(), birth_date.day());
    today.year() - birth_date.year() - if had_birthday { 0 } else { 1 }
}
