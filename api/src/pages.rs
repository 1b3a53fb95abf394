use axum::response::Html;

const INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>LUW Bench</title>
  <style>
    body { font-family: sans-serif; max-width: 44rem; margin: 2rem auto; }
    h2 { margin-top: 1.5rem; }
    li { margin: 0.3rem 0; }
  </style>
</head>
<body>
  <h1>LUW Bench: SQL vs NoSQL durable writes</h1>
  <p>Every write is acknowledged only after it reaches the on-disk log
     (SQLite WAL with synchronous=FULL, KeyDB/Redis AOF confirmed by WAITAOF
     or appendfsync always).</p>

  <h2>Insert users</h2>
  <ul>
    <li><a href="/benchmark/write/100">100</a></li>
    <li><a href="/benchmark/write/1000">1,000</a></li>
    <li><a href="/benchmark/write/10000">10,000</a></li>
  </ul>

  <h2>Read users</h2>
  <ul>
    <li><a href="/benchmark/read/100">100</a></li>
    <li><a href="/benchmark/read/1000">1,000</a></li>
    <li><a href="/benchmark/read/10000">10,000</a></li>
  </ul>

  <h2>Decrement product stock</h2>
  <ul>
    <li><a href="/inventory/1000">Seed 1,000 products</a></li>
    <li><a href="/benchmark/update/100">100</a></li>
    <li><a href="/benchmark/update/1000">1,000</a></li>
  </ul>

  <h2>Data</h2>
  <ul>
    <li><a href="/records/users">Sample users</a></li>
    <li><a href="/records/products">Sample products</a></li>
    <li><a href="/reset">Clear everything</a></li>
  </ul>
</body>
</html>
"#;

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX)
}
