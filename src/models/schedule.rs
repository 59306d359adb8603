//! Ventanas de horario para la detección de conflictos de conductores

use chrono::{Duration, NaiveDateTime};

/// Intervalo de sensibilidad `[salida - descanso, llegada + descanso]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ScheduleWindow {
    pub fn around(departure: NaiveDateTime, arrival: NaiveDateTime, rest_buffer: Duration) -> Self {
        Self {
            start: departure - rest_buffer,
            end: arrival + rest_buffer,
        }
    }

    /// Solapamiento semiabierto con el intervalo `[departure, arrival]` de otro viaje
    pub fn intersects(&self, departure: NaiveDateTime, arrival: NaiveDateTime) -> bool {
        departure < self.end && arrival > self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_window_extends_one_hour_each_side() {
        let window = ScheduleWindow::around(at(12, 30), at(14, 0), Duration::hours(1));
        assert_eq!(window.start, at(11, 30));
        assert_eq!(window.end, at(15, 0));
    }

    #[test]
    fn test_exactly_one_hour_gap_does_not_intersect() {
        let window = ScheduleWindow::around(at(13, 0), at(15, 0), Duration::hours(1));
        // 10:00-12:00 termina justo al inicio de la ventana
        assert!(!window.intersects(at(10, 0), at(12, 0)));
        // 16:00-18:00 empieza justo al final de la ventana
        assert!(!window.intersects(at(16, 0), at(18, 0)));
    }

    #[test]
    fn test_short_gap_intersects() {
        let window = ScheduleWindow::around(at(12, 30), at(14, 0), Duration::hours(1));
        assert!(window.intersects(at(10, 0), at(12, 0)));
    }

    #[test]
    fn test_window_spans_midnight() {
        let late = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(23, 30, 0).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(0, 20, 0).unwrap();
        let window = ScheduleWindow::around(late, late + Duration::hours(2), Duration::hours(1));
        assert!(window.intersects(next_day, next_day + Duration::hours(3)));
    }
}
