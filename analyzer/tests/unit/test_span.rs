//! Span extraction and occurrence correlation tests

use fwu_analyzer::extract::occurrence::{find_all, ResponseLocator, SecondOccurrence};
use fwu_analyzer::extract::span::balanced_span;

const UUID: &str = "30313436-3631-5a43-3331-313230303432";

fn depth_profile(span: &str) -> Vec<i32> {
    let mut depth = 0;
    span.chars()
        .map(|c| {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            depth
        })
        .collect()
}

#[test]
fn test_balance_zero_at_end_positive_inside() {
    let payloads = [
        r#"{}"#,
        r#"{"a": 1}"#,
        r#"{"hapi": {"install_set": {"Name": "SPP"}, "x": [{"y": {}}]}}"#,
    ];
    for payload in payloads {
        let text = format!("Request {u} = {{\"r\": 1}}\nResponse {u} = {p} tail }}", u = UUID, p = payload);
        let second = find_all(&text, UUID)[1];
        let span = balanced_span(&text, second, '{', '}').unwrap();
        let profile = depth_profile(span.slice(&text));

        assert_eq!(*profile.last().unwrap(), 0);
        assert!(profile[..profile.len() - 1].iter().all(|d| *d > 0));
        assert_eq!(span.slice(&text), payload);
    }
}

#[test]
fn test_second_occurrence_ignores_request_payload() {
    let text = format!(
        "2024-03-01 Request for server {u}: {{\"hapi\": {{\"kind\": \"request\"}}}}\n\
         2024-03-01 noise {{\"unrelated\": true}}\n\
         2024-03-01 Response for server {u}: {{\"hapi\": {{\"kind\": \"response\"}}}}\n",
        u = UUID
    );
    let payload = SecondOccurrence.locate(&text, UUID).unwrap();
    assert!(payload.contains("response"));
    assert!(!payload.contains("request"));
}

#[test]
fn test_locator_is_replaceable() {
    struct FirstOccurrence;

    impl ResponseLocator for FirstOccurrence {
        fn locate<'a>(
            &self,
            text: &'a str,
            server: &str,
        ) -> Result<&'a str, fwu_analyzer::errors::AnalyzerError> {
            let at = text.find(server).ok_or_else(|| {
                fwu_analyzer::errors::AnalyzerError::AmbiguityFailure(server.to_string())
            })?;
            fwu_analyzer::extract::span::object_after(text, at).ok_or_else(|| {
                fwu_analyzer::errors::AnalyzerError::MalformedPayload(server.to_string())
            })
        }
    }

    let text = format!("{} = {{\"only\": 1}}", UUID);
    let locator: &dyn ResponseLocator = &FirstOccurrence;
    assert_eq!(locator.locate(&text, UUID).unwrap(), "{\"only\": 1}");
    assert!(SecondOccurrence.locate(&text, UUID).is_err());
}
