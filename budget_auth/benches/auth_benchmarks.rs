use budget_auth::auth::{InterimTokenIssuer, PasswordHasher, TotpEngine, User};
use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

fn bench_user() -> User {
    User {
        id: Uuid::new_v4(),
        email: "bench@example.com".to_string(),
        password_hash: String::new(),
        two_factor_enabled: true,
        two_factor_secret: None,
        created_at: Utc::now(),
    }
}

/// Argon2id is deliberately slow; keep the sample small
fn bench_password_hash(c: &mut Criterion) {
    let hasher = PasswordHasher::new("bench_pepper_value");
    let mut group = c.benchmark_group("password");
    group.sample_size(10);

    group.bench_function("hash", |b| {
        b.iter(|| hasher.hash(black_box("correct horse battery")).unwrap())
    });

    let hash = hasher.hash("correct horse battery").unwrap();
    group.bench_function("verify", |b| {
        b.iter(|| hasher.verify(black_box("correct horse battery"), black_box(&hash)))
    });

    group.finish();
}

fn bench_totp(c: &mut Criterion) {
    let engine = TotpEngine::new("BudgetMax");
    let secret = engine.generate_secret("bench@example.com").unwrap().secret;
    let bytes = Secret::Encoded(secret.clone()).to_bytes().unwrap();
    let code = TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "bench".to_string())
        .unwrap()
        .generate_current()
        .unwrap();

    c.bench_function("totp_generate_secret", |b| {
        b.iter(|| engine.generate_secret(black_box("bench@example.com")).unwrap())
    });

    c.bench_function("totp_validate", |b| {
        b.iter(|| engine.validate(black_box(&code), black_box(&secret)))
    });
}

fn bench_interim_token(c: &mut Criterion) {
    let issuer = InterimTokenIssuer::new("bench_interim_secret_0123456789abcdef", Duration::minutes(5));
    let user = bench_user();
    let token = issuer.issue(&user).unwrap();

    c.bench_function("interim_issue", |b| {
        b.iter(|| issuer.issue(black_box(&user)).unwrap())
    });

    c.bench_function("interim_verify", |b| {
        b.iter(|| issuer.verify(black_box(&token)).unwrap())
    });
}

criterion_group!(hashing, bench_password_hash);

criterion_group!(tokens, bench_totp, bench_interim_token);

criterion_main!(hashing, tokens);
