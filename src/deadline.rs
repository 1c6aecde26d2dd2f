//! Cálculo de plazos en días hábiles.
//!
//! Sólo se excluyen sábados y domingos; no hay calendario de feriados.
//! La fecha de inicio nunca se cuenta: el conteo empieza al día siguiente.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Indica si la fecha cae de lunes a viernes.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Suma `days` días hábiles a `start`, avanzando de a un día calendario.
///
/// Con `days == 0` devuelve `start` sin cambios, aunque caiga en fin de semana.
/// Satura en `NaiveDate::MAX` en lugar de desbordar.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut current = start;
    let mut counted = 0;
    while counted < days {
        current = match current.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return NaiveDate::MAX,
        };
        if is_business_day(current) {
            counted += 1;
        }
    }
    current
}

/// Días calendario entre hoy y el vencimiento; negativo si ya venció.
pub fn days_remaining(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}
