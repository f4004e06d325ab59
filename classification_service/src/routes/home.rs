use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html(
        "<h1>Welcome to the Image Classification API</h1>\
         <p>Use the /predict endpoint to upload an image for classification.</p>",
    )
}
