/// Backend primary keys are 64-bit integers.
pub type DbId = i64;

/// Calendar days carry no time or offset.
pub type CalendarDay = chrono::NaiveDate;
