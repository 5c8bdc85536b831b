/// Subject and HTML body of the message carrying a verification code.
pub fn verification_email(username: &str, code: &str) -> (String, String) {
    let subject = "Código de verificación - LISTI".to_string();
    let html = format!(
        r#"<h2>Hola {name},</h2>
<p>Tu código de verificación para LISTI es:</p>
<h1 style="color:#007bff">{code}</h1>
<p>Por favor ingrésalo en la página para activar tu cuenta.</p>
"#,
        name = escape_html(username),
        code = escape_html(code),
    );
    (subject, html)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
