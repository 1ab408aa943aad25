//! End-to-end acquisition workflow over a real TCP connection.

use prodigy_sim::clock::SystemClock;
use prodigy_sim::config::Settings;
use prodigy_sim::network::client::RemoteClient;
use prodigy_sim::network::server::RemoteInServer;
use prodigy_sim::protocol::{CommandKind, ErrorTag};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server() -> SocketAddr {
    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = 0;
    let server = RemoteInServer::bind(Arc::new(settings), Arc::new(SystemClock))
        .await
        .expect("bind server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    addr
}

/// Polls the acquisition status until the controller reports completion.
async fn wait_for_completion(client: &mut RemoteClient) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = client
            .send(CommandKind::GetAcquisitionStatus, &[])
            .await
            .expect("status");
        assert!(response.is_ok());
        if response.param("ControllerState") == Some("completed") {
            break;
        }
        assert_eq!(response.param("ControllerState"), Some("running"));
        assert!(
            tokio::time::Instant::now() < deadline,
            "acquisition did not complete in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn full_acquisition_workflow() {
    let addr = spawn_server().await;
    let mut client = RemoteClient::connect(addr).await.expect("connect");

    let response = client.send(CommandKind::Connect, &[]).await.expect("send");
    assert!(response.is_ok());
    assert_eq!(response.param("ProtocolVersion"), Some("1.2"));

    let response = client
        .send(
            CommandKind::DefineSpectrumFat,
            &[
                ("StartEnergy", "82.0"),
                ("EndEnergy", "86.0"),
                ("StepWidth", "0.5"),
                ("DwellTime", "0.02"),
                ("PassEnergy", "10.0"),
                ("LensMode", "Wide Angle"),
            ],
        )
        .await
        .expect("define");
    assert!(response.is_ok());

    let response = client
        .send(CommandKind::ValidateSpectrum, &[])
        .await
        .expect("validate");
    assert!(response.is_ok());
    assert_eq!(response.param("Samples"), Some("9"));
    // The quoted lens mode survives the round trip.
    assert_eq!(response.param("LensMode"), Some("Wide Angle"));

    let response = client.send(CommandKind::Start, &[]).await.expect("start");
    assert!(response.is_ok());

    wait_for_completion(&mut client).await;

    let response = client
        .send(
            CommandKind::GetAcquisitionData,
            &[("FromIndex", "0"), ("ToIndex", "8")],
        )
        .await
        .expect("data");
    assert!(response.is_ok());
    assert_eq!(response.param("FromIndex"), Some("0"));
    assert_eq!(response.param("ToIndex"), Some("8"));
    let data = response.param("Data").expect("data values");
    assert!(data.starts_with('[') && data.ends_with(']'));
    let values: Vec<&str> = data[1..data.len() - 1].split(',').collect();
    assert_eq!(values.len(), 9);
    for value in &values {
        value.parse::<f64>().expect("numeric sample");
    }

    // Reading the same range twice returns identical data.
    let again = client
        .send(
            CommandKind::GetAcquisitionData,
            &[("FromIndex", "0"), ("ToIndex", "8")],
        )
        .await
        .expect("data again");
    assert_eq!(again.param("Data"), response.param("Data"));

    let response = client
        .send(CommandKind::ClearSpectrum, &[])
        .await
        .expect("clear");
    assert!(response.is_ok());

    let response = client
        .send(CommandKind::GetAcquisitionStatus, &[])
        .await
        .expect("status after clear");
    assert_eq!(response.error_tag(), Some(ErrorTag::InvalidState));

    let response = client
        .send(CommandKind::Disconnect, &[])
        .await
        .expect("disconnect");
    assert!(response.is_ok());
}

#[tokio::test]
async fn clear_mid_acquisition_abandons_job() {
    let addr = spawn_server().await;
    let mut client = RemoteClient::connect(addr).await.expect("connect");

    assert!(client.send(CommandKind::Connect, &[]).await.expect("send").is_ok());
    assert!(client
        .send(
            CommandKind::DefineSpectrumFat,
            &[
                ("StartEnergy", "82.0"),
                ("EndEnergy", "86.0"),
                ("StepWidth", "0.1"),
                // Long dwell keeps the acquisition running while we clear it.
                ("DwellTime", "10.0"),
                ("PassEnergy", "10.0"),
            ],
        )
        .await
        .expect("define")
        .is_ok());
    assert!(client
        .send(CommandKind::ValidateSpectrum, &[])
        .await
        .expect("validate")
        .is_ok());
    assert!(client.send(CommandKind::Start, &[]).await.expect("start").is_ok());

    let response = client
        .send(CommandKind::GetAcquisitionStatus, &[])
        .await
        .expect("status");
    assert_eq!(response.param("ControllerState"), Some("running"));

    assert!(client
        .send(CommandKind::ClearSpectrum, &[])
        .await
        .expect("clear")
        .is_ok());

    let response = client
        .send(CommandKind::GetAcquisitionStatus, &[])
        .await
        .expect("status after clear");
    assert_eq!(response.error_tag(), Some(ErrorTag::InvalidState));

    assert!(client
        .send(CommandKind::Disconnect, &[])
        .await
        .expect("disconnect")
        .is_ok());
}

#[tokio::test]
async fn not_yet_available_and_out_of_bounds_over_the_wire() {
    let addr = spawn_server().await;
    let mut client = RemoteClient::connect(addr).await.expect("connect");

    assert!(client.send(CommandKind::Connect, &[]).await.expect("send").is_ok());
    assert!(client
        .send(
            CommandKind::DefineSpectrumFat,
            &[
                ("StartEnergy", "0.0"),
                ("EndEnergy", "10.0"),
                ("StepWidth", "1.0"),
                ("DwellTime", "10.0"),
                ("PassEnergy", "20.0"),
            ],
        )
        .await
        .expect("define")
        .is_ok());
    assert!(client
        .send(CommandKind::ValidateSpectrum, &[])
        .await
        .expect("validate")
        .is_ok());
    assert!(client.send(CommandKind::Start, &[]).await.expect("start").is_ok());

    // 11 samples in total; index 50 does not exist at all.
    let response = client
        .send(
            CommandKind::GetAcquisitionData,
            &[("FromIndex", "0"), ("ToIndex", "50")],
        )
        .await
        .expect("data");
    assert_eq!(response.error_tag(), Some(ErrorTag::OutOfBounds));

    // Index 10 exists but cannot be ready after a few milliseconds of a
    // 10 s dwell.
    let response = client
        .send(
            CommandKind::GetAcquisitionData,
            &[("FromIndex", "0"), ("ToIndex", "10")],
        )
        .await
        .expect("data");
    assert_eq!(response.error_tag(), Some(ErrorTag::NotYetAvailable));

    // The first sample is ready immediately.
    let response = client
        .send(
            CommandKind::GetAcquisitionData,
            &[("FromIndex", "0"), ("ToIndex", "0")],
        )
        .await
        .expect("data");
    assert!(response.is_ok());

    assert!(client
        .send(CommandKind::Disconnect, &[])
        .await
        .expect("disconnect")
        .is_ok());
}

#[tokio::test]
async fn analyzer_parameters_over_the_wire() {
    let addr = spawn_server().await;
    let mut client = RemoteClient::connect(addr).await.expect("connect");

    assert!(client.send(CommandKind::Connect, &[]).await.expect("send").is_ok());

    let response = client
        .send(CommandKind::GetAnalyzerVisibleName, &[])
        .await
        .expect("visible name");
    assert_eq!(response.param("VisibleName"), Some("KREIOS 150"));

    let response = client
        .send(CommandKind::GetAllAnalyzerParameterNames, &[])
        .await
        .expect("names");
    let names = response.param("ParameterNames").expect("names value");
    assert!(names.contains("\"Detector Voltage\""));

    let response = client
        .send(
            CommandKind::GetAnalyzerParameterValue,
            &[("ParameterName", "Detector Voltage")],
        )
        .await
        .expect("get value");
    assert_eq!(response.param("Name"), Some("Detector Voltage"));
    assert_eq!(response.param("Value"), Some("1200.0"));

    assert!(client
        .send(
            CommandKind::SetAnalyzerParameterValue,
            &[("ParameterName", "Detector Voltage"), ("Value", "1350.0")],
        )
        .await
        .expect("set value")
        .is_ok());

    let response = client
        .send(
            CommandKind::GetAnalyzerParameterValue,
            &[("ParameterName", "Detector Voltage")],
        )
        .await
        .expect("get value again");
    assert_eq!(response.param("Value"), Some("1350.0"));

    let response = client
        .send(
            CommandKind::GetAnalyzerParameterValue,
            &[("ParameterName", "Flux Capacitor")],
        )
        .await
        .expect("unknown parameter");
    assert_eq!(response.error_tag(), Some(ErrorTag::MissingOrInvalidField));

    // Parameter writes are session-local; a second connection still sees
    // the configured default.
    let mut second = RemoteClient::connect(addr).await.expect("connect second");
    assert!(second.send(CommandKind::Connect, &[]).await.expect("send").is_ok());
    let response = second
        .send(
            CommandKind::GetAnalyzerParameterValue,
            &[("ParameterName", "Detector Voltage")],
        )
        .await
        .expect("get value on second session");
    assert_eq!(response.param("Value"), Some("1200.0"));
}
