use crate::domains::envelope::ContentId;

#[derive(Debug, Clone, Default)]
pub struct GatewayResolver {
    bases: Vec<String>,
}

impl GatewayResolver {
    pub fn new(bases: Vec<String>) -> Self {
        let bases = bases
            .into_iter()
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .collect();
        Self { bases }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn url(base: &str, cid: &ContentId) -> String {
        format!("{}/ipfs/{}", base.trim_end_matches('/'), cid)
    }

    pub fn urls(&self, cid: &ContentId) -> Vec<String> {
        self.bases.iter().map(|base| Self::url(base, cid)).collect()
    }
}
