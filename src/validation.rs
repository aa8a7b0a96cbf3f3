use chrono::NaiveDate;

use crate::builder::{ClassForm, MAX_SELECTABLE_DAYS};
use crate::edit::EditForm;
use crate::error::ApiError;
use crate::recurrence::parse_clock;

pub const MAX_CAPACITY: u32 = 500;

pub fn validate_weeks(value: u8) -> Result<u8, ApiError> {
    if (1..=6).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest("weeks must be between 1 and 6".into()))
    }
}

pub fn validate_capacity(value: u32) -> Result<u32, ApiError> {
    if (1..=MAX_CAPACITY).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(format!(
            "capacity must be between 1 and {MAX_CAPACITY}"
        )))
    }
}

/// Both times must be `HH:mm` and the end must come after the start.
pub fn validate_time_range(start: &str, end: &str) -> Result<(), ApiError> {
    let start_time = parse_clock(start)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid start time: {start}")))?;
    let end_time = parse_clock(end)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid end time: {end}")))?;
    if end_time <= start_time {
        return Err(ApiError::BadRequest(
            "end time must be after start time".into(),
        ));
    }
    Ok(())
}

pub fn validate_class_form(form: &ClassForm) -> Result<(), ApiError> {
    validate_capacity(form.capacity)?;
    if !form.is_recurring {
        return validate_time_range(&form.start_time, &form.end_time);
    }
    for slot in form.submitted_slots() {
        validate_time_range(&slot.start_time, &slot.end_time)?;
    }
    Ok(())
}

pub fn validate_edit_form(form: &EditForm) -> Result<(), ApiError> {
    if let Some(capacity) = form.capacity {
        validate_capacity(capacity)?;
    }
    if let (Some(start), Some(end)) = (&form.start_time, &form.end_time) {
        validate_time_range(start, end)?;
    }
    Ok(())
}

/// Preview windows are inclusive and capped like the date picker.
pub fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(NaiveDate, NaiveDate), ApiError> {
    if end < start {
        return Err(ApiError::BadRequest("end must not be before start".into()));
    }
    if (end - start).num_days() >= MAX_SELECTABLE_DAYS as i64 {
        return Err(ApiError::BadRequest(format!(
            "window must not exceed {MAX_SELECTABLE_DAYS} days"
        )));
    }
    Ok((start, end))
}
