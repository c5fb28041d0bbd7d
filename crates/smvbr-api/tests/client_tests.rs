// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use smvbr_api::{ApiError, Client, GENERIC_FAILURE_MESSAGE};
use smvbr_app::{
    ChangePasswordForm, FilterCriteria, LoginForm, RegistrationForm, SessionContext, UserId,
    VehicleId,
};
use smvbr_testkit::{VehicleFaker, comparison_payload, corolla_record};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

struct Expected {
    method: Method,
    url: &'static str,
    status: u16,
    reply: String,
    body: Option<Value>,
}

impl Expected {
    fn new(url: &'static str, reply: Value) -> Self {
        Self {
            method: Method::Get,
            url,
            status: 200,
            reply: reply.to_string(),
            body: None,
        }
    }

    fn with_method(mut self, method: Method, body: Value) -> Self {
        self.method = method;
        self.body = Some(body);
        self
    }

    fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Serves each expectation in order on a background thread and checks
/// method, path with query, and JSON body.
fn mock_server(expectations: Vec<Expected>) -> Result<(String, thread::JoinHandle<()>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for expected in expectations {
            let mut request = server.recv().expect("request expected");
            assert_eq!(request.method(), &expected.method);
            assert_eq!(request.url(), expected.url);

            if let Some(body) = &expected.body {
                let mut raw = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut raw)
                    .expect("request body should be readable");
                let sent: Value = serde_json::from_str(&raw).expect("request body is JSON");
                assert_eq!(&sent, body);
            }

            let response = Response::from_string(expected.reply)
                .with_status_code(expected.status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
    });

    Ok((addr, handle))
}

fn session() -> SessionContext {
    SessionContext::new(UserId::new(3))
}

#[test]
fn client_rejects_bad_base_urls() {
    for bad in ["", "   ", "not a url", "ftp://files.example.com"] {
        let error = Client::new(bad, Duration::from_secs(1)).expect_err("base URL should be rejected");
        assert!(matches!(error, ApiError::InvalidBaseUrl { .. }), "{bad:?}");
        assert!(error.to_string().contains("api.base_url"));
    }
}

#[tokio::test]
async fn unreachable_server_yields_connection_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(200))?;
    let error = client
        .list_vehicles(None)
        .await
        .expect_err("listing should fail for unreachable endpoint");
    assert!(matches!(error, ApiError::Connection { .. }));
    assert!(error.to_string().contains("check that the API server is running"));
    assert_eq!(error.user_message(), GENERIC_FAILURE_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn list_vehicles_unwraps_carros_and_keeps_server_note() -> Result<()> {
    let records = VehicleFaker::new(4).catalog(3);
    let (addr, handle) = mock_server(vec![
        Expected::new("/carros", json!({ "carros": records, "total": 3 })),
        Expected::new(
            "/carros?busca=corola",
            json!({
                "mensagem": "Nenhum carro encontrado com 'corola', exibindo resultados semelhantes a 'COROLLA'",
                "carros": [corolla_record()],
                "total": 1,
            }),
        ),
    ])?;

    let client = Client::new(&format!("{addr}/"), Duration::from_secs(2))?;
    assert_eq!(client.base_url(), addr);

    let page = client.list_vehicles(Some("  ")).await?;
    assert_eq!(page.records.len(), 3);
    assert_eq!(page.total, Some(3));
    assert_eq!(page.message, None);

    let fuzzy = client.list_vehicles(Some(" corola ")).await?;
    assert_eq!(fuzzy.records.len(), 1);
    assert!(fuzzy.message.is_some_and(|note| note.contains("COROLLA")));

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn filter_sends_only_set_criteria() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Expected::new(
            "/filtro-carros?brand=Fiat&air_conditioning=true&fuel_type=F",
            json!({ "resultados": [{ "veiculo_id": 2, "marca": "Fiat" }] }),
        ),
        Expected::new("/filtro-carros", json!([])),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let criteria = FilterCriteria {
        brand: Some(" Fiat ".to_owned()),
        engine: Some(String::new()),
        air_conditioning: Some(true),
        fuel_type: Some("F".to_owned()),
        ..FilterCriteria::default()
    };
    let records = client.filter_vehicles(&criteria).await?;
    assert_eq!(records, vec![json!({ "veiculo_id": 2, "marca": "Fiat" })]);

    let empty = client.filter_vehicles(&FilterCriteria::default()).await?;
    assert!(empty.is_empty());

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn favorites_round_trip() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Expected::new("/favoritar/3", json!({ "mensagem": "Veículo favoritado" }))
            .with_method(Method::Post, json!({ "codigo": "7" })),
        Expected::new("/veiculos_favoritos/3", json!([corolla_record()])),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let note = client.toggle_favorite(&session(), "7").await?;
    assert_eq!(note.as_deref(), Some("Veículo favoritado"));

    let favorites = client.favorites(&session()).await?;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["veiculo_id"], 7);

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn vehicle_and_comparison_fetches() -> Result<()> {
    let mut faker = VehicleFaker::new(9);
    let left = faker.record(1, smvbr_testkit::Dialect::Legacy);
    let right = faker.record(2, smvbr_testkit::Dialect::English);
    let (addr, handle) = mock_server(vec![
        Expected::new("/carros/7", json!({ "carro": corolla_record() })),
        Expected::new(
            "/comparar-carros?id1=1&id2=2",
            comparison_payload(left.clone(), right.clone()),
        ),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let vehicle = client.vehicle(VehicleId::new(7)).await?;
    assert_eq!(vehicle["MARCA"], "Toyota");

    let payload = client.compare(VehicleId::new(1), VehicleId::new(2)).await?;
    assert_eq!(payload["carro1"], left);
    assert_eq!(payload["carro2"], right);

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn login_surfaces_server_detail() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Expected::new("/login", json!({ "message": "Bem-vindo Ana!", "usuario_id": 3 }))
            .with_method(Method::Post, json!({ "email": "ana@example.com", "senha": "segredo" })),
        Expected::new("/login", json!({ "detail": "Credenciais inválidas" }))
            .with_method(Method::Post, json!({ "email": "ana@example.com", "senha": "errada" }))
            .with_status(401),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let ok = client
        .login(&LoginForm {
            email: " ana@example.com ".to_owned(),
            password: "segredo".to_owned(),
        })
        .await?;
    assert_eq!(ok.user_id, Some(UserId::new(3)));
    assert_eq!(ok.message.as_deref(), Some("Bem-vindo Ana!"));

    let error = client
        .login(&LoginForm {
            email: "ana@example.com".to_owned(),
            password: "errada".to_owned(),
        })
        .await
        .expect_err("wrong password should fail");
    assert_eq!(error.status(), Some(401));
    assert_eq!(error.user_message(), "Credenciais inválidas");

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn register_returns_session_user() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Expected::new(
            "/cadastro",
            json!({ "usuario_id": 11, "nome": "Bia", "email": "bia@example.com" }),
        )
        .with_method(
            Method::Post,
            json!({ "nome": "Bia", "email": "bia@example.com", "senha": "abc123" }),
        ),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let user = client
        .register(&RegistrationForm {
            name: "Bia ".to_owned(),
            email: "bia@example.com".to_owned(),
            password: "abc123".to_owned(),
        })
        .await?;
    let session = user.session();
    assert_eq!(session.user_id, UserId::new(11));
    assert_eq!(session.name.as_deref(), Some("Bia"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn account_updates_and_deletion() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Expected::new("/usuario/senha", json!({ "detail": "Senha atualizada" })).with_method(
            Method::Put,
            json!({ "usuario_id": 3, "nova_senha": "novasenha" }),
        ),
        Expected::new("/usuario", json!({ "detail": "Conta excluída" }))
            .with_method(Method::Delete, json!({ "usuario_id": 3 })),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2))?;

    let updated = client
        .change_password(
            &session(),
            &ChangePasswordForm {
                current: "antiga".to_owned(),
                new: "novasenha".to_owned(),
                confirmation: "novasenha".to_owned(),
            },
        )
        .await?;
    assert_eq!(updated.as_deref(), Some("Senha atualizada"));

    let deleted = client.delete_account(&session()).await?;
    assert_eq!(deleted.as_deref(), Some("Conta excluída"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[tokio::test]
async fn invalid_form_never_reaches_the_network() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(100))?;
    let error = client
        .change_password(
            &session(),
            &ChangePasswordForm {
                current: "antiga".to_owned(),
                new: "abcdef".to_owned(),
                confirmation: "abcdeX".to_owned(),
            },
        )
        .await
        .expect_err("mismatched confirmation should be rejected");
    assert!(matches!(error, ApiError::Invalid(_)));
    assert!(error.user_message().contains("do not match"));
    Ok(())
}
