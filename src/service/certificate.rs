use uuid::Uuid;

use crate::models::responsemodel::Response;

/// Placeholder completion receipt. Deterministic in its inputs, carries no
/// proof of anything.
pub fn certificate_id(survey_id: Uuid, user_id: Uuid, response_id: Uuid) -> String {
    format!("NFT-CERT-{}-{}-{}", survey_id, user_id, response_id)
}

/// Receipt for a completed, attributed response.
pub fn for_response(response: &Response) -> Option<String> {
    if !response.is_completed() {
        return None;
    }
    response
        .user_id
        .map(|user_id| certificate_id(response.survey_id, user_id, response.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responsemodel::ClientMeta;
    use chrono::Utc;

    #[test]
    fn same_response_same_certificate() {
        let (s, u, r) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(certificate_id(s, u, r), certificate_id(s, u, r));
        assert_eq!(certificate_id(s, u, r), format!("NFT-CERT-{}-{}-{}", s, u, r));
    }

    #[test]
    fn only_completed_attributed_responses_get_one() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let mut response = Response::start(Uuid::new_v4(), Some(user_id), ClientMeta::default(), now);
        assert_eq!(for_response(&response), None);

        response.mark_completed(now, 60, 5.0);
        let id = for_response(&response).unwrap();
        assert!(id.contains(&user_id.to_string()));
        assert_eq!(for_response(&response), Some(id));

        let mut anonymous = Response::start(Uuid::new_v4(), None, ClientMeta::default(), now);
        anonymous.mark_completed(now, 60, 5.0);
        assert_eq!(for_response(&anonymous), None);
    }
}
