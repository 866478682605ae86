//! End-to-end scan: synthetic live feed, capture, extraction, validation

use cardscan::session::{
    ExtractionRequest, ExtractionResponse, ExtractionService, FieldMap, RecordUpdateService,
};
use cardscan::testing::card_frame;
use cardscan::{
    Boundary, CardDetector, CardSide, CropCascade, DetectorSession, Result, ScanConfig, ScanError,
    ScanSession, ScanState,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Records what it was sent and answers with a fixed record.
struct MockExtraction {
    fields: FieldMap,
    seen: Mutex<Vec<(bool, bool, String)>>,
}

impl MockExtraction {
    fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ExtractionService for MockExtraction {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResponse> {
        self.seen.lock().unwrap().push((
            request.front.is_cropped(),
            request.back.is_cropped(),
            request.identifier.clone(),
        ));
        Ok(ExtractionResponse {
            record_id: "card-0042".to_string(),
            fields: self.fields.clone(),
        })
    }
}

struct RejectingUpdates;

impl RecordUpdateService for RejectingUpdates {
    async fn update_record(&self, record_id: &str, _fields: &FieldMap) -> Result<()> {
        Err(ScanError::RecordUpdate(format!("{} is locked", record_id)))
    }
}

fn fields(entries: &[(&str, serde_json::Value)]) -> FieldMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_full_scan_submits_originals() {
    let config = ScanConfig::default();
    let detector = Arc::new(CardDetector::from_config(&config));
    let detection = DetectorSession::new(detector.clone(), &config.detection);
    let cascade = CropCascade::new(&config.capture, detector);
    let mut session = ScanSession::new(&config);

    for side in [CardSide::Front, CardSide::Back] {
        let frame = card_frame(320, 240, Boundary::new(80, 60, 160, 100));
        detection.process_frame(&frame);
        detection.process_frame(&frame);
        let boundary = detection.capture_boundary();
        assert!(boundary.is_some());

        let output = cascade.capture(frame, boundary, side);
        assert!(output.cropped.image().width() < 320);
        session.set_capture(&output).unwrap();
        detection.reset();
    }
    session.set_identifier("0791234567").unwrap();
    assert!(session.can_start());

    let service = MockExtraction::new(fields(&[
        ("name", json!("Amina Haddad")),
        ("national_id", json!("1234 5678 9012")),
        ("nationality", json!("JO")),
        ("expiry_date", json!("2031-04-30")),
    ]));
    let snapshot = session.run(&service).await;

    assert_eq!(snapshot.state, ScanState::Complete);
    assert_eq!(snapshot.extraction_confidence, Some(100));
    assert!(snapshot.image_quality.is_some());
    assert_eq!(
        service.seen.lock().unwrap().as_slice(),
        &[(false, false, "0791234567".to_string())]
    );
}

#[tokio::test]
async fn test_low_confidence_record_still_completes() {
    let mut session = ScanSession::new(&ScanConfig::default());
    let frame = card_frame(160, 100, Boundary::new(20, 10, 120, 75));
    session
        .set_image(cardscan::CardImage::original(frame.image.clone(), CardSide::Front))
        .unwrap();
    session
        .set_image(cardscan::CardImage::original(frame.image, CardSide::Back))
        .unwrap();
    session.set_identifier("+44 20 7946 0958").unwrap();

    let mut record = fields(&[
        ("national_id", json!("123456789012")),
        ("expiry_date", json!("2031-04-30")),
        ("address", json!("12 Rainbow St")),
    ]);
    for key in ["name", "nationality", "gender", "birth_date", "birth_place", "issuer", "mrz"] {
        record.insert(key.to_string(), json!(""));
    }

    let snapshot = session.run(&MockExtraction::new(record)).await;
    assert_eq!(snapshot.state, ScanState::Complete);
    assert_eq!(snapshot.extraction_confidence, Some(50));
    assert_eq!(snapshot.issues.len(), 3);

    let err = session
        .update_record(&RejectingUpdates, FieldMap::new())
        .await
        .unwrap_err();
    assert!(err.is_remote());
    assert!(err.to_string().contains("card-0042 is locked"));
    assert_eq!(session.state(), ScanState::Complete);
}

#[tokio::test]
async fn test_independent_sessions_run_concurrently() {
    let config = ScanConfig::default();
    let service = Arc::new(MockExtraction::new(fields(&[("name", json!("A"))])));

    let mut handles = Vec::new();
    for i in 0..3 {
        let config = config.clone();
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let mut session = ScanSession::new(&config);
            let image = card_frame(64, 40, Boundary::new(8, 8, 48, 24)).image;
            session
                .set_image(cardscan::CardImage::original(image.clone(), CardSide::Front))
                .unwrap();
            session
                .set_image(cardscan::CardImage::original(image, CardSide::Back))
                .unwrap();
            session.set_identifier(&format!("079123456{}", i)).unwrap();
            session.run(service.as_ref()).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.state, ScanState::Complete);
        ids.push(snapshot.session_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(service.seen.lock().unwrap().len(), 3);
}

#[test]
fn test_front_only_never_leaves_idle() {
    let mut session = ScanSession::new(&ScanConfig::default());
    let image = card_frame(64, 40, Boundary::new(8, 8, 48, 24)).image;
    tokio_test::assert_ok!(session.set_image(cardscan::CardImage::original(image, CardSide::Front)));
    tokio_test::assert_ok!(session.set_identifier("0791234567"));

    let service = MockExtraction::new(FieldMap::new());
    let snapshot = tokio_test::block_on(session.run(&service));
    assert_eq!(snapshot.state, ScanState::Idle);
    assert!(service.seen.lock().unwrap().is_empty());
    tokio_test::assert_err!(session.set_identifier("call me"));
}
