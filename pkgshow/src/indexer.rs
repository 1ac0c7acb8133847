//! Tantivy indexer for package search
//!
//! Every query token must match in at least one of name, package, synopsis or
//! description. BM25 decides the order, with name and package matches boosted;
//! equal scores fall back to the package's static rank.

use crate::interface::{Hit, HitSource, PkgShowError, SearchResult, TokenSet};
use crate::models::FullPackage;
use crate::tokenizer::{normalize, tokenize, tokens_of, Span};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::path::Path;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::{TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::{DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, TantivyDocument, Term};
use thiserror::Error;
use tracing::debug;

/// Name the shared tokenizer is registered under.
pub const PACKAGE_TOKENIZER: &str = "pkgshow";

/// Hits returned per query unless configured otherwise.
pub const DEFAULT_HIT_LIMIT: usize = 5000;

const NAME_BOOST: Score = 3.0;
const PACKAGE_BOOST: Score = 2.0;

/// Tantivy adapter over `tokenize`: emits normalized token spans, skips separators.
#[derive(Clone, Default)]
pub struct PackageTokenizer;

impl Tokenizer for PackageTokenizer {
    type TokenStream<'a> = PackageTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        PackageTokenStream {
            text,
            spans: tokenize(text).into_iter(),
            token: Token::default(),
            position: 0,
        }
    }
}

pub struct PackageTokenStream<'a> {
    text: &'a str,
    spans: std::vec::IntoIter<Span>,
    token: Token,
    position: usize,
}

impl TokenStream for PackageTokenStream<'_> {
    fn advance(&mut self) -> bool {
        for span in self.spans.by_ref() {
            if !span.is_token() {
                continue;
            }
            self.token.offset_from = span.start;
            self.token.offset_to = span.end;
            self.token.position = self.position;
            self.token.position_length = 1;
            self.token.text.clear();
            self.token.text.push_str(&normalize(span.text(self.text)));
            self.position += 1;
            return true;
        }
        false
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

/// Error type for indexer operations
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("Directory error: {0}")]
    Directory(#[from] tantivy::directory::error::OpenDirectoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IndexerResult<T> = Result<T, IndexerError>;

struct Fields {
    package_id: Field,
    package: Field,
    name: Field,
    synopsis: Field,
    description: Field,
    important_sentences: Field,
    readme_fn: Field,
    star_count: Field,
    static_rank: Field,
}

impl Fields {
    fn from_schema(schema: &Schema) -> IndexerResult<Self> {
        Ok(Self {
            package_id: schema.get_field("package_id")?,
            package: schema.get_field("package")?,
            name: schema.get_field("name")?,
            synopsis: schema.get_field("synopsis")?,
            description: schema.get_field("description")?,
            important_sentences: schema.get_field("important_sentences")?,
            readme_fn: schema.get_field("readme_fn")?,
            star_count: schema.get_field("star_count")?,
            static_rank: schema.get_field("static_rank")?,
        })
    }
}

/// Tantivy-based package indexer
pub struct Indexer {
    index: Index,
    writer: RwLock<IndexWriter>,
    reader: RwLock<IndexReader>,
    fields: Fields,
    hit_limit: usize,
}

impl Indexer {
    /// Open or create an indexer at the given path
    pub fn new(path: &Path) -> IndexerResult<Self> {
        std::fs::create_dir_all(path)?;
        let dir = MmapDirectory::open(path)?;
        let schema = Self::build_schema();
        let index = Index::open_or_create(dir, schema)?;
        Self::register_tokenizer(&index);

        let writer = index.writer(50_000_000)?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;

        Self::from_parts(index, writer, reader)
    }

    /// Create an in-memory indexer
    pub fn new_in_memory() -> IndexerResult<Self> {
        let schema = Self::build_schema();
        let index = Index::create_in_ram(schema);
        Self::register_tokenizer(&index);

        let writer = index.writer(15_000_000)?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;

        Self::from_parts(index, writer, reader)
    }

    /// Cap on the hits `HitSource::search` returns
    pub fn with_hit_limit(mut self, hit_limit: usize) -> Self {
        self.hit_limit = hit_limit;
        self
    }

    fn from_parts(index: Index, writer: IndexWriter, reader: IndexReader) -> IndexerResult<Self> {
        let fields = Fields::from_schema(&index.schema())?;
        Ok(Self {
            fields,
            index,
            writer: RwLock::new(writer),
            reader: RwLock::new(reader),
            hit_limit: DEFAULT_HIT_LIMIT,
        })
    }

    fn build_schema() -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field("package_id", STRING | STORED);

        let text_field_indexing = TextFieldIndexing::default()
            .set_tokenizer(PACKAGE_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default()
            .set_indexing_options(text_field_indexing)
            .set_stored();
        for name in ["package", "name", "synopsis", "description"] {
            builder.add_text_field(name, text_options.clone());
        }

        builder.add_text_field("important_sentences", STORED);
        builder.add_text_field("readme_fn", STORED);
        builder.add_i64_field("star_count", STORED);
        builder.add_i64_field("static_rank", STORED | FAST);
        builder.build()
    }

    fn register_tokenizer(index: &Index) {
        let analyzer = TextAnalyzer::builder(PackageTokenizer).build();
        index.tokenizers().register(PACKAGE_TOKENIZER, analyzer);
    }

    /// Add or replace the document for a package. Readme data is not indexed.
    pub fn add_package(&self, pkg: &FullPackage) -> IndexerResult<()> {
        let writer = self.writer.read();
        let f = &self.fields;

        writer.delete_term(Term::from_field_text(f.package_id, &pkg.package));

        let mut doc = TantivyDocument::default();
        doc.add_text(f.package_id, &pkg.package);
        doc.add_text(f.package, &pkg.package);
        doc.add_text(f.name, &pkg.name);
        doc.add_text(f.synopsis, &pkg.synopsis);
        doc.add_text(f.description, &pkg.description);
        for sentence in &pkg.important_sentences {
            doc.add_text(f.important_sentences, sentence);
        }
        doc.add_text(f.readme_fn, &pkg.readme_fn);
        doc.add_i64(f.star_count, pkg.star_count);
        doc.add_i64(f.static_rank, pkg.static_rank);

        writer.add_document(doc)?;
        Ok(())
    }

    pub fn commit(&self) -> IndexerResult<()> {
        self.writer.write().commit()?;
        self.reader.write().reload()?;
        Ok(())
    }

    pub fn delete_package(&self, package: &str) -> IndexerResult<()> {
        let writer = self.writer.read();
        writer.delete_term(Term::from_field_text(self.fields.package_id, package));
        Ok(())
    }

    /// Remove every document and commit
    pub fn clear(&self) -> IndexerResult<()> {
        let mut writer = self.writer.write();
        writer.delete_all_documents()?;
        writer.commit()?;
        drop(writer);
        self.reader.write().reload()?;
        Ok(())
    }

    /// Get the number of documents in the index
    pub fn num_docs(&self) -> u64 {
        self.reader.read().searcher().num_docs()
    }

    /// Conjunction over query tokens of a boosted disjunction over the text fields.
    fn build_query(&self, tokens: &TokenSet) -> BooleanQuery {
        let f = &self.fields;
        let mut words: Vec<&str> = tokens.iter().collect();
        words.sort_unstable();

        let clauses = words
            .into_iter()
            .map(|word| {
                let per_field: Vec<(Occur, Box<dyn Query>)> = [
                    (f.name, NAME_BOOST),
                    (f.package, PACKAGE_BOOST),
                    (f.synopsis, 1.0),
                    (f.description, 1.0),
                ]
                .into_iter()
                .map(|(field, boost)| {
                    let term = TermQuery::new(
                        Term::from_field_text(field, word),
                        IndexRecordOption::WithFreqs,
                    );
                    let query: Box<dyn Query> = Box::new(BoostQuery::new(Box::new(term), boost));
                    (Occur::Should, query)
                })
                .collect();
                let query: Box<dyn Query> = Box::new(BooleanQuery::new(per_field));
                (Occur::Must, query)
            })
            .collect();
        BooleanQuery::new(clauses)
    }

    /// Ranked hits for `query`, at most `limit` of them, plus the query's token set.
    ///
    /// `total_results` counts every matching document, not only the returned ones.
    pub fn search(&self, query: &str, limit: usize) -> IndexerResult<(SearchResult, TokenSet)> {
        let tokens = tokens_of(query);
        if tokens.is_empty() || limit == 0 {
            return Ok((SearchResult::default(), tokens));
        }

        let reader = self.reader.read();
        let searcher = reader.searcher();
        let query = self.build_query(&tokens);

        let top_collector = TopDocs::with_limit(limit).tweak_score(
            move |segment_reader: &tantivy::SegmentReader| {
                let ranks = segment_reader.fast_fields().i64("static_rank").ok();
                move |doc: DocId, score: Score| {
                    let rank = ranks.as_ref().and_then(|col| col.first(doc)).unwrap_or(i64::MAX);
                    (score, Reverse(rank))
                }
            },
        );

        let (total_results, top_docs) = searcher.search(&query, &(Count, top_collector))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (_, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(self.doc_to_hit(&doc));
        }

        debug!(tokens = tokens.len(), total_results, hits = hits.len(), "index search");
        Ok((SearchResult { total_results, hits }, tokens))
    }

    fn doc_to_hit(&self, doc: &TantivyDocument) -> Hit {
        let f = &self.fields;
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let int = |field: Field| doc.get_first(field).and_then(|v| v.as_i64()).unwrap_or(0);

        Hit {
            package: text(f.package_id),
            name: text(f.name),
            synopsis: text(f.synopsis),
            description: text(f.description),
            important_sentences: doc
                .get_all(f.important_sentences)
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            readme_fn: text(f.readme_fn),
            readme_data: String::new(),
            star_count: int(f.star_count),
            static_rank: int(f.static_rank),
        }
    }
}

impl HitSource for Indexer {
    fn search(&self, query: &str) -> Result<(SearchResult, TokenSet), PkgShowError> {
        Ok(Indexer::search(self, query, self.hit_limit)?)
    }
}
