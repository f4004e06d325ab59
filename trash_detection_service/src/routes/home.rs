use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html(
        "<h1>Welcome to the Trash Detection API</h1>\
         <p>Use the /upload endpoint to upload a drone image for trash detection.</p>",
    )
}
