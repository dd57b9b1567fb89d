// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use isp_provisioner::config::DialectSettings;
use isp_provisioner::olt::{CliTransport, HostKeyPolicy, OltAutomation, OltDialect};
use isp_provisioner::{DeviceEndpoint, Error, Result, Timeouts};

/// Scripted OLT: one canned reply per line received
struct ScriptedOlt {
    output: VecDeque<String>,
    replies: VecDeque<String>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedOlt {
    fn new(replies: &[&str]) -> Self {
        Self {
            output: VecDeque::from(["\r\nWelcome to GPON OLT\r\nOLT1>".to_string()]),
            replies: replies.iter().map(|r| (*r).to_string()).collect(),
            sent: Arc::default(),
            closed: Arc::default(),
        }
    }
}

impl CliTransport for ScriptedOlt {
    async fn send(&mut self, line: &str) -> Result<()> {
        self.sent.lock().unwrap().push(line.to_string());
        if let Some(reply) = self.replies.pop_front() {
            self.output.push_back(format!("{line}\r\n{reply}"));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.output.pop_front() {
            Some(chunk) => Ok(Some(chunk.into_bytes())),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn automation() -> OltAutomation {
    OltAutomation {
        endpoint: DeviceEndpoint::new("192.0.2.10", 22, "admin", "admin"),
        dialect: OltDialect::new(DialectSettings::default()).unwrap(),
        settle: Duration::from_secs(5),
        timeouts: Timeouts::olt(),
        host_key_policy: HostKeyPolicy::Disabled,
    }
}

const ENABLE: &str = "OLT1#";
const CONFIGURE: &str = "OLT1(config)#";
const INTERFACE: &str = "OLT1(config-if-gpon)#";

const AUTOFIND: &str = "\
  NO   PON   ONU   SN              PASSWORD\r
  1    8     0     TPLG-CEEECC28   -\r
OLT1(config)#";

const INFO: &str = "\
  NO  PON  ONU  SN             ONLINE  ACTIVE     CONFIG   MATCH\r
  1   8    3    TPLG-CEEECC28  online  activated  success  match\r
OLT1(config)#";

#[tokio::test(start_paused = true)]
async fn test_provision_happy_path() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        AUTOFIND,
        INTERFACE,
        "  Number of ONTs that can be confirmed: 1, success: 1\r\nOLT1(config-if-gpon)#",
        "  1   8    0    TPLG-CEEECC28  online  active  -5.84    1.71\r\nOLT1(config-if-gpon)#",
    ]);
    let sent = olt.sent.clone();
    let closed = olt.closed.clone();

    let started = tokio::time::Instant::now();
    let record = automation()
        .provision_over(olt, "485754434ceeecc28", "Juan Perez")
        .await
        .unwrap();

    assert_eq!(record.pon_id, 8);
    assert_eq!(record.onu_id, 0);
    assert_eq!(record.gpon_serial, "TPLG-CEEECC28");
    assert_eq!(record.online_status, "online");
    assert!((record.rx_dbm - -5.84).abs() < f64::EPSILON);
    // the confirm step waits before the optical read
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(closed.load(Ordering::SeqCst));

    assert_eq!(
        *sent.lock().unwrap(),
        vec![
            "enable",
            "configure",
            "show ont autofind by-sn TPLG-CEEECC28 1/0/1-8",
            "interface gpon 1/0/8",
            "ont confirm sn-auth TPLG-CEEECC28 desc Juan_Perez ont-lineprofile-id 1 ont-srvprofile-id 2",
            "show ont optical-info gpon 1/0/8 0",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deprovision_happy_path() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        INFO,
        INTERFACE,
        "  Number of ONTs that can be deactivated: 1, success: 1\r\nOLT1(config-if-gpon)#",
        "  Number of ONTs that can be deleted: 1, success: 1\r\nOLT1(config-if-gpon)#",
    ]);
    let sent = olt.sent.clone();
    let closed = olt.closed.clone();

    let outcome = automation()
        .deprovision_over(olt, "TPLG-CEEECC28")
        .await
        .unwrap();

    assert_eq!((outcome.pon_id, outcome.onu_id), (8, 3));
    assert!(outcome.deactivate_output.contains("deactivated: 1"));
    assert!(outcome.delete_output.contains("deleted: 1"));
    assert!(closed.load(Ordering::SeqCst));

    let sent = sent.lock().unwrap();
    assert_eq!(sent[2], "show ont info by-sn TPLG-CEEECC28 1/0/1-8");
    assert_eq!(sent[4], "ont deactivate 3");
    assert_eq!(sent[5], "ont delete 3");
}

#[tokio::test(start_paused = true)]
async fn test_query_reads_registered_position() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        INFO,
        INTERFACE,
        "  1   8    3    TPLG-CEEECC28  online  active  -21.40   2.05\r\nOLT1(config-if-gpon)#",
    ]);
    let sent = olt.sent.clone();

    let record = automation().query_over(olt, "ceeecc28").await.unwrap();
    assert_eq!((record.pon_id, record.onu_id), (8, 3));
    assert!((record.rx_dbm - -21.40).abs() < f64::EPSILON);
    assert_eq!(
        sent.lock().unwrap().last().map(String::as_str),
        Some("show ont optical-info gpon 1/0/8 3")
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_serial_stops_before_interface() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        "  NO   PON   ONU   SN   PASSWORD\r\nOLT1(config)#",
    ]);
    let sent = olt.sent.clone();
    let closed = olt.closed.clone();

    let result = automation()
        .provision_over(olt, "TPLG-0A1B2C3D", "")
        .await;
    match result {
        Err(Error::DeviceNotFound { serial, range }) => {
            assert_eq!(serial, "TPLG-0A1B2C3D");
            assert_eq!(range, "1/0/1-8");
        }
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(sent.lock().unwrap().len(), 3);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_silent_device_times_out_and_closes() {
    // configure is never answered
    let olt = ScriptedOlt::new(&[ENABLE]);
    let closed = olt.closed.clone();

    match automation().query_over(olt, "TPLG-CEEECC28").await {
        Err(e @ Error::UnexpectedDeviceResponse { .. }) => {
            assert!(e.is_transient());
            assert!(e.to_string().contains("configure"));
        }
        other => panic!("expected unexpected response, got {other:?}"),
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_system_info() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        "  System Name          - OLT1\r\n  Software Version     - V2.1.4\r\nOLT1(config)#",
    ]);
    let info = automation().system_info_over(olt).await.unwrap();
    assert_eq!(info.system_name.as_deref(), Some("OLT1"));
    assert_eq!(info.software_version.as_deref(), Some("V2.1.4"));
}

#[tokio::test(start_paused = true)]
async fn test_provision_reads_onu_from_autofind_row() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        "  1    8     2     TPLG-CEEECC28   -\r\nOLT1(config)#",
        INTERFACE,
        "  Number of ONTs that can be confirmed: 1, success: 1\r\nOLT1(config-if-gpon)#",
        "  1   8    2    TPLG-CEEECC28  online  active  -7.10    2.00\r\nOLT1(config-if-gpon)#",
    ]);
    let sent = olt.sent.clone();

    let record = automation()
        .provision_over(olt, "TPLG-CEEECC28", "")
        .await
        .unwrap();
    assert_eq!((record.pon_id, record.onu_id), (8, 2));
    assert_eq!(
        sent.lock().unwrap().last().map(String::as_str),
        Some("show ont optical-info gpon 1/0/8 2")
    );
}

#[tokio::test(start_paused = true)]
async fn test_provision_prefers_onu_from_confirm_acknowledgement() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        AUTOFIND,
        INTERFACE,
        "  PON 8, ONTID :5, success\r\nOLT1(config-if-gpon)#",
        "  1   8    5    TPLG-CEEECC28  online  active  -6.02    1.80\r\nOLT1(config-if-gpon)#",
    ]);
    let sent = olt.sent.clone();

    let record = automation()
        .provision_over(olt, "TPLG-CEEECC28", "")
        .await
        .unwrap();
    assert_eq!(record.onu_id, 5);
    assert_eq!(
        sent.lock().unwrap().last().map(String::as_str),
        Some("show ont optical-info gpon 1/0/8 5")
    );
}

#[tokio::test(start_paused = true)]
async fn test_garbled_autofind_row_is_parse_failure() {
    let olt = ScriptedOlt::new(&[
        ENABLE,
        CONFIGURE,
        "  1   8/0   TPLG-CEEECC28   -\r\nOLT1(config)#",
    ]);
    let sent = olt.sent.clone();

    match automation().provision_over(olt, "TPLG-CEEECC28", "").await {
        Err(Error::ParseFailure { step, .. }) => assert_eq!(step, "autofind"),
        other => panic!("expected parse failure, got {other:?}"),
    }
    assert_eq!(sent.lock().unwrap().len(), 3);
}
