// src/import_tests.rs

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;
    use tokio::runtime::Runtime;

    use crate::import::*;
    use crate::mock_directory::{MockDirectory, RemoteCall};
    use crate::sessions::AttendanceSession;

    fn session(id: &str, date: &str, check_in: &str, check_out: &str) -> AttendanceSession {
        let check_in =
            NaiveDateTime::parse_from_str(&format!("{} {}", date, check_in), "%Y-%m-%d %H:%M").unwrap();
        let check_out =
            NaiveDateTime::parse_from_str(&format!("{} {}", date, check_out), "%Y-%m-%d %H:%M").unwrap();
        AttendanceSession {
            identifier: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            check_in,
            check_out,
            duration_hours: (check_out - check_in).num_seconds() as f64 / 3600.0,
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_quota_error_is_grouped_by_message() {
        let rt = Runtime::new().unwrap();
        let directory =
            MockDirectory::with_employees(&["E1", "E2"]).fail_attendance("E2", "quota exceeded");
        let runner = ImportRunner::new(&directory);
        let sessions = vec![
            session("E1", "2024-05-02", "08:00", "17:30"),
            session("E2", "2024-05-02", "09:00", "17:00"),
        ];

        let summary = rt.block_on(runner.run(&sessions, &ids(&["E1", "E2"])));

        assert_eq!(summary.successes(), 1);
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.tally.errors.len(), 1);
        assert_eq!(summary.tally.errors[0].message, "quota exceeded");
        assert_eq!(summary.tally.errors[0].identifiers, vec!["E2".to_string()]);
        assert_eq!(summary.outcomes[1].status, ImportStatus::Failed);
        assert_eq!(
            summary.outcomes[1].error_message.as_deref(),
            Some("quota exceeded")
        );
    }

    #[test]
    fn test_unknown_identifiers_are_skipped_not_failed() {
        let rt = Runtime::new().unwrap();
        let directory = MockDirectory::with_employees(&["E1", "E2"]);
        let runner = ImportRunner::new(&directory);
        let sessions = vec![
            session("E1", "2024-05-02", "08:00", "16:00"),
            session("E2", "2024-05-02", "08:00", "16:00"),
            session("E1", "2024-05-03", "08:00", "16:00"),
        ];

        let summary = rt.block_on(runner.run(&sessions, &ids(&["E1"])));

        assert_eq!(summary.tally.attempted(), 2);
        assert_eq!(summary.failures(), 0);
        assert_eq!(directory.attendance_calls().len(), 2);
        assert!(!directory
            .calls()
            .contains(&RemoteCall::Resolve("E2".to_string())));
    }

    #[test]
    fn test_failure_does_not_stop_later_sessions() {
        let rt = Runtime::new().unwrap();
        let directory = MockDirectory::with_employees(&["E1", "E2", "E3"])
            .fail_attendance("E1", "overlapping attendance");
        let runner = ImportRunner::new(&directory);
        let sessions = vec![
            session("E1", "2024-05-02", "08:00", "16:00"),
            session("E2", "2024-05-02", "08:00", "16:00"),
            session("E3", "2024-05-02", "08:00", "16:00"),
        ];

        let summary = rt.block_on(runner.run(&sessions, &ids(&["E1", "E2", "E3"])));

        assert_eq!(summary.successes(), 2);
        assert_eq!(summary.failures(), 1);
        let statuses: Vec<ImportStatus> = summary.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                ImportStatus::Failed,
                ImportStatus::Succeeded,
                ImportStatus::Succeeded
            ]
        );
    }

    #[test]
    fn test_resolution_miss_and_lookup_error_are_failures() {
        let rt = Runtime::new().unwrap();
        // E5 was known at classification time but has since disappeared
        let directory = MockDirectory::with_employees(&["E1"]).fail_lookup("E1", "timeout");
        let runner = ImportRunner::new(&directory);
        let sessions = vec![
            session("E1", "2024-05-02", "08:00", "16:00"),
            session("E5", "2024-05-02", "08:00", "16:00"),
            session("E5", "2024-05-03", "08:00", "16:00"),
        ];

        let summary = rt.block_on(runner.run(&sessions, &ids(&["E1", "E5"])));

        assert_eq!(summary.successes(), 0);
        assert_eq!(summary.failures(), 3);
        assert_eq!(
            summary.tally.identifiers_for("timeout").unwrap(),
            &["E1".to_string()]
        );
        assert_eq!(
            summary
                .tally
                .identifiers_for("employee not found in remote directory")
                .unwrap(),
            &["E5".to_string(), "E5".to_string()]
        );
        assert!(directory.attendance_calls().is_empty());
    }

    #[test]
    fn test_sessions_are_sent_in_order_with_check_out() {
        let rt = Runtime::new().unwrap();
        let directory = MockDirectory::with_employees(&["E1"]);
        let runner = ImportRunner::new(&directory);
        let sessions = vec![
            session("E1", "2024-05-02", "08:00", "16:00"),
            session("E1", "2024-05-03", "07:30", "15:00"),
        ];

        rt.block_on(runner.run(&sessions, &ids(&["E1"])));

        let calls = directory.calls();
        assert_eq!(
            calls,
            vec![
                RemoteCall::Resolve("E1".to_string()),
                RemoteCall::CreateAttendance {
                    identifier: "E1".to_string(),
                    check_in: sessions[0].check_in,
                    check_out: Some(sessions[0].check_out),
                },
                RemoteCall::Resolve("E1".to_string()),
                RemoteCall::CreateAttendance {
                    identifier: "E1".to_string(),
                    check_in: sessions[1].check_in,
                    check_out: Some(sessions[1].check_out),
                },
            ]
        );
    }
}
