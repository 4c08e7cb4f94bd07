use vcstore_core::CoreError;

/// Maps a Kubernetes API failure into the core taxonomy.
///
/// 404 becomes `NotFound`; 409 becomes `AlreadyExists` or `Conflict`
/// depending on the reason the API server gives.
pub fn map_kube_error(entity: &'static str, id: &str, err: kube::Error) -> CoreError {
    match err {
        kube::Error::Api(response) if response.code == 404 => CoreError::not_found(entity, id),
        kube::Error::Api(response) if response.code == 409 => {
            if response.reason == "AlreadyExists" {
                CoreError::already_exists(entity, id)
            } else {
                CoreError::conflict(entity, id)
            }
        }
        kube::Error::Api(response) => CoreError::Persistence(format!(
            "{entity} `{id}`: {} ({})",
            response.message, response.code
        )),
        other => CoreError::Persistence(format!("{entity} `{id}`: {other}")),
    }
}
