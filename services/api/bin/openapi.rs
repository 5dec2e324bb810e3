use podcast_api::router::ApiDoc;
use utoipa::OpenApi;

/// Generates the OpenAPI document and writes it to a file.
fn write_openapi(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc_json = api_doc.to_pretty_json()?;
    std::fs::write(path, doc_json)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    write_openapi(ApiDoc::openapi(), "openapi.json")?;
    Ok(())
}
