// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! XSS payload corpus.

/// Payloads the detector must flag, grouped by the vector they use.
pub const DETECTED: &[(&str, &str)] = &[
    ("script pair", "<script>alert(1)</script>"),
    ("script pair, attributes", "<script type=\"text/javascript\">fetch('/c?'+document.cookie)</script>"),
    ("script pair, mixed case", "<ScRiPt>alert(1)</sCrIpT>"),
    ("script pair, multiline", "<script>\nalert(1)\n</script>"),
    ("javascript uri", "javascript:alert(1)"),
    ("javascript uri, upper", "JAVASCRIPT:alert(1)"),
    ("javascript uri in href", "<a href=\"javascript:void(0)\">click</a>"),
    ("event handler", "<body onload=alert(1)>"),
    ("event handler, spaced", "<div onmouseover = \"x()\">"),
    ("img onerror", "<img src=x onerror=alert(1)>"),
    ("img onerror, no space", "<IMG SRC=# onerror=alert(1)>"),
    ("svg onload", "<svg onload=alert(1)>"),
    ("svg onload, slash", "<svg/onload=alert(1)>"),
    ("css expression", "width: expression(alert(1))"),
    ("css expression, spaced", "x:expression (alert(1))"),
    ("data url", "background: url(data:text/html;base64,PHNjcmlwdD4=)"),
    ("data url, quoted", "background: url( 'data:image/svg+xml,<svg/onload=alert(1)>' )"),
];

/// Ordinary storefront input that must pass detection untouched.
pub const BENIGN: &[&str] = &[
    "Maria da Silva",
    "João D'Ávila",
    "Rua Augusta, 1500 - apto 42",
    "Av. Brigadeiro Faria Lima, 3477",
    "maria+promo@example.com",
    "(11) 98765-4321",
    "01310-100",
    "4111 1111 1111 1111",
    "12/28",
    "Deixar na portaria, por favor :)",
    "Salon & Spa",
    "2 < 3 and 5 > 4",
    "Please contact= me",
    "upload your metadata: later",
];
