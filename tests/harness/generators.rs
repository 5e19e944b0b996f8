// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Form fixtures for simulation.

use serde_json::{json, Value};

/// A valid shipping address.
pub fn valid_address() -> Value {
    json!({
        "fullName": "Maria da Silva",
        "email": "maria@example.com",
        "phone": "(11) 98765-4321",
        "cep": "01310-100",
        "street": "Avenida Paulista",
        "number": "1578",
        "complement": "Conjunto 42",
        "neighborhood": "Bela Vista",
        "city": "São Paulo",
        "state": "SP"
    })
}

/// A valid checkout submission with a card expiring in December 2099.
pub fn valid_checkout() -> Value {
    json!({
        "address": valid_address(),
        "payment": {
            "cardNumber": "4111 1111 1111 1111",
            "cardName": "Maria da Silva",
            "expiry": "12/99",
            "cvv": "123"
        },
        "acceptTerms": true
    })
}

/// Distinct newsletter signups.
pub fn newsletter_signups(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "email": format!("reader-{i}@example.com") }))
        .collect()
}
