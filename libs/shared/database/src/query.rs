use std::fmt::Display;

/// PostgREST query for a single table: horizontal filters plus ordering and
/// limits, rendered as `/rest/v1/{table}?...`.
#[derive(Debug, Clone)]
pub struct Query {
    table: String,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            params: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{}.asc", column)));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{}.desc", column)));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn to_path(&self) -> String {
        if self.params.is_empty() {
            return format!("/rest/v1/{}", self.table);
        }

        let query = self
            .params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        format!("/rest/v1/{}?{}", self.table, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_table_path() {
        assert_eq!(Query::table("doctors").to_path(), "/rest/v1/doctors");
    }

    #[test]
    fn test_filters_are_encoded() {
        let path = Query::table("users")
            .eq("email", "jane+test@example.com")
            .limit(1)
            .to_path();

        assert_eq!(path, "/rest/v1/users?email=eq.jane%2Btest%40example.com&limit=1");
    }

    #[test]
    fn test_specialty_with_space_and_ordering() {
        let path = Query::table("real_doctors")
            .eq("specialty", "Orthopedic Surgeon")
            .order_desc("rating")
            .to_path();

        assert_eq!(
            path,
            "/rest/v1/real_doctors?specialty=eq.Orthopedic%20Surgeon&order=rating.desc"
        );
    }
}
